//! Client-side state reconciliation core for the LAN chat app.
//!
//! Two independent, unordered event streams (peer lifecycle events from the
//! discovery service, connection/message events from the messaging transport)
//! are reconciled by a single-threaded actor into one consistent
//! view: a peer directory, per-peer chat sessions, and a bounded notification
//! queue. The presentation layer dispatches actions, reads state snapshots
//! and listens for updates; it never touches the domain maps directly.

mod actions;
mod core;
mod discovery;
mod error;
mod logging;
mod state;
mod transport;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use discovery::{
    DiscoveryService, PeerEventEnvelope, PeerInfo, PeerLifecycleEvent, PeerMetadata,
};
pub use error::{CoreError, TransportError};
pub use state::*;
pub use transport::{MessageTransport, TransportEvent, TransportEventEnvelope};
pub use updates::{AppUpdate, CoreMsg, InternalEvent};

pub use crate::core::{
    synthesized_peer_id, AddressResolver, ConnectionTransition, NotificationQueue, PeerDirectory,
    ReceiveOutcome, SessionStore,
};

/// Revocable handle for an event subscription. Cancellation is idempotent and
/// safe from any thread; forwarding stops at the next delivery after cancel.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Presentation-side callback for state updates. Called from a dedicated
/// listener thread; implementations must be thread-safe and non-blocking.
pub trait StateObserver: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

/// Handle owned by the presentation layer. Spawns the reconciliation actor on
/// its own thread; everything except the request-reply `send_message` is
/// non-blocking.
pub struct ChatApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shut_down: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
}

impl ChatApp {
    pub fn new(
        data_dir: String,
        discovery: Arc<dyn DiscoveryService>,
        transport: Arc<dyn MessageTransport>,
    ) -> Arc<Self> {
        logging::init_logging();
        tracing::info!(data_dir = %data_dir, "ChatApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));

        // Actor loop thread (single threaded "app actor"). A current-thread
        // runtime means every reconciliation step, including its awaited
        // transport boundary calls, runs to completion before the next queued
        // event is considered.
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .expect("tokio runtime");
            runtime.block_on(async move {
                let core = crate::core::AppCore::new(
                    update_tx,
                    core_tx_for_core,
                    data_dir,
                    shared_for_core,
                    discovery,
                    transport,
                );
                core.run(core_rx).await;
            });
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            shared_state,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, observer: Box<dyn StateObserver>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split updates.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                observer.reconcile(update);
            }
        });
    }

    /// Tear down the core: both event subscriptions are revoked and the actor
    /// stops after draining what was already queued. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if self
            .shut_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let _ = self.core_tx.send(CoreMsg::Shutdown);
    }

    // ---- operations exposed to the presentation layer ----

    pub fn start_chat(&self, peer_id: &str, peer_name: &str, peer_addr: &str) {
        self.dispatch(AppAction::StartChat {
            peer_id: peer_id.to_string(),
            peer_name: peer_name.to_string(),
            peer_addr: peer_addr.to_string(),
        });
    }

    /// Send a message to a peer with an existing session.
    ///
    /// Runs as a request-reply through the actor so it is ordered with every
    /// previously dispatched action: a send queued right behind `start_chat`
    /// sees the session that action created. Fails with
    /// [`CoreError::NoSession`] when no session exists (nothing is mutated
    /// in that case) and with [`CoreError::Transport`] when the transport
    /// rejects delivery; the locally appended message is not retracted then.
    /// There is no delivery acknowledgment: success guarantees the local
    /// append and the transport handoff, not remote receipt. No timeout is
    /// enforced; callers may impose their own.
    pub fn send_message(&self, peer_id: &str, content: &str) -> Result<(), CoreError> {
        let (reply_tx, reply_rx) = flume::bounded(1);
        let sent = self.core_tx.send(CoreMsg::SendMessageRequest {
            peer_id: peer_id.to_string(),
            content: content.to_string(),
            reply: reply_tx,
        });
        if sent.is_err() {
            return Err(CoreError::Transport(TransportError::new(
                "reconciliation core is shut down",
            )));
        }
        reply_rx.recv().unwrap_or_else(|_| {
            Err(CoreError::Transport(TransportError::new(
                "reconciliation core is shut down",
            )))
        })
    }

    pub fn mark_as_read(&self, peer_id: &str) {
        self.dispatch(AppAction::MarkAsRead {
            peer_id: peer_id.to_string(),
        });
    }

    pub fn set_active_session(&self, peer_id: Option<String>) {
        self.dispatch(AppAction::SetActiveSession { peer_id });
    }

    pub fn dismiss_notification(&self, id: &str) {
        self.dispatch(AppAction::DismissNotification { id: id.to_string() });
    }

    pub fn refresh_peers(&self) {
        self.dispatch(AppAction::RefreshPeers);
    }

    pub fn refresh_transport_status(&self) {
        self.dispatch(AppAction::RefreshTransportStatus);
    }

    pub fn unread_count(&self, peer_id: &str) -> u32 {
        self.state()
            .sessions
            .get(peer_id)
            .map(|s| s.unread_count)
            .unwrap_or(0)
    }

    pub fn total_unread_count(&self) -> u32 {
        self.state().total_unread_count()
    }
}
