mod config;
mod directory;
mod notifications;
mod resolver;
mod sessions;

use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::discovery::{DiscoveryService, PeerLifecycleEvent};
use crate::error::CoreError;
use crate::state::{AppState, ChatNotification, PeerDescriptor, TransportStatus};
use crate::transport::{MessageTransport, TransportEvent};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};
use crate::Subscription;

pub use directory::PeerDirectory;
pub use notifications::NotificationQueue;
pub use resolver::{synthesized_peer_id, AddressResolver};
pub use sessions::{ConnectionTransition, ReceiveOutcome, SessionStore};

/// The reconciliation actor. Owns every piece of domain state; runs on a
/// single-threaded runtime and processes each delivered message to
/// completion, awaiting the transport boundary inline, before the next is
/// considered, so no locking exists on the domain maps.
pub struct AppCore {
    rev: u64,

    directory: PeerDirectory,
    resolver: AddressResolver,
    sessions: SessionStore,
    notifications: NotificationQueue,
    active_session: Option<String>,
    transport_status: TransportStatus,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    config: config::CoreConfig,
    discovery: Arc<dyn DiscoveryService>,
    transport: Arc<dyn MessageTransport>,

    subscriptions: Vec<Subscription>,
    running: bool,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        discovery: Arc<dyn DiscoveryService>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let config = config::load_core_config(&data_dir);

        let this = Self {
            rev: 0,
            directory: PeerDirectory::new(),
            resolver: AddressResolver::new(),
            sessions: SessionStore::new(),
            notifications: NotificationQueue::new(),
            active_session: None,
            transport_status: TransportStatus::default(),
            update_sender,
            core_sender,
            shared_state,
            config,
            discovery,
            transport,
            subscriptions: Vec::new(),
            running: true,
        };

        // Ensure ChatApp::state() has an immediately-available snapshot.
        let snapshot = this.build_snapshot();
        this.commit_state_snapshot(&snapshot);
        this
    }

    pub async fn run(mut self, receiver: flume::Receiver<CoreMsg>) {
        self.bootstrap().await;
        while self.running {
            match receiver.recv_async().await {
                Ok(msg) => self.handle_message(msg).await,
                Err(_) => break,
            }
        }
        tracing::info!("core loop stopped");
    }

    /// Subscribe both streams first (events buffer in their channels), then
    /// apply the bulk peer fetch as the directory baseline, so buffered live
    /// events land on top of the baseline and never get shadowed by it.
    async fn bootstrap(&mut self) {
        let (peer_rx, peer_sub) = self.discovery.subscribe();
        let tx = self.core_sender.clone();
        let sub = peer_sub.clone();
        tokio::spawn(async move {
            while let Ok(envelope) = peer_rx.recv_async().await {
                if sub.is_cancelled() {
                    break;
                }
                if tx
                    .send(CoreMsg::Internal(Box::new(InternalEvent::PeerEvent {
                        envelope,
                    })))
                    .is_err()
                {
                    break;
                }
            }
        });
        self.subscriptions.push(peer_sub);

        let (transport_rx, transport_sub) = self.transport.subscribe();
        let tx = self.core_sender.clone();
        let sub = transport_sub.clone();
        tokio::spawn(async move {
            while let Ok(envelope) = transport_rx.recv_async().await {
                if sub.is_cancelled() {
                    break;
                }
                if tx
                    .send(CoreMsg::Internal(Box::new(InternalEvent::TransportEvent {
                        envelope,
                    })))
                    .is_err()
                {
                    break;
                }
            }
        });
        self.subscriptions.push(transport_sub);

        match self.discovery.fetch_current_peers().await {
            Ok(peers) => {
                tracing::info!(count = peers.len(), "peer baseline loaded");
                self.directory.merge_baseline(peers);
                self.resolver.rebuild(&self.directory);
            }
            Err(err) => {
                // The live stream will still populate the directory; start
                // from an empty baseline.
                tracing::warn!(%err, "initial peer fetch failed");
            }
        }

        self.refresh_transport_status();
        self.emit_state();
    }

    pub async fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(ref action) => {
                // Never log the action payload: it can contain message bodies.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action.clone()).await;
            }
            CoreMsg::SendMessageRequest {
                peer_id,
                content,
                reply,
            } => {
                tracing::info!(action = "SendMessage", "dispatch");
                let result = self.send_message(peer_id, content).await;
                let _ = reply.send(result);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
            CoreMsg::Shutdown => self.teardown(),
        }
    }

    fn teardown(&mut self) {
        // Cancellation is idempotent; a second shutdown finds them already
        // cancelled.
        for sub in &self.subscriptions {
            sub.cancel();
        }
        self.running = false;
        tracing::info!("core teardown");
    }

    async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::StartChat {
                peer_id,
                peer_name,
                peer_addr,
            } => self.start_chat(peer_id, peer_name, peer_addr).await,
            AppAction::SendMessage { peer_id, content } => {
                // Fire-and-forget dispatch path; failures were already
                // surfaced as notifications or logs inside.
                let _ = self.send_message(peer_id, content).await;
            }
            AppAction::MarkAsRead { peer_id } => {
                if self.sessions.mark_read(&peer_id) {
                    self.emit_sessions();
                }
            }
            AppAction::SetActiveSession { peer_id } => self.set_active_session(peer_id),
            AppAction::DismissNotification { id } => {
                if self.notifications.dismiss(&id) {
                    self.emit_notifications();
                }
            }
            AppAction::RefreshPeers => self.refresh_peers().await,
            AppAction::RefreshTransportStatus => {
                self.refresh_transport_status();
                self.emit_state();
            }
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::PeerEvent { envelope } => {
                tracing::debug!(
                    event_id = %envelope.id,
                    event_type = %envelope.event_type,
                    source = %envelope.source,
                    "peer_event"
                );
                match PeerLifecycleEvent::try_from(envelope) {
                    Ok(event) => self.apply_peer_event(event),
                    // Fatal to this event only; the stream continues.
                    Err(err) => tracing::warn!(%err, "discovery event rejected"),
                }
            }
            InternalEvent::TransportEvent { envelope } => {
                tracing::debug!(
                    event_id = %envelope.id,
                    event_type = %envelope.event_type,
                    addr = %envelope.addr,
                    "transport_event"
                );
                match TransportEvent::try_from(envelope) {
                    Ok(event) => self.apply_transport_event(event),
                    Err(err) => tracing::warn!(%err, "transport event rejected"),
                }
            }
        }
    }

    // ---- user actions ----

    /// No partial state exists before the transport confirms the connection;
    /// a failure therefore has nothing to roll back.
    async fn start_chat(&mut self, peer_id: String, peer_name: String, peer_addr: String) {
        match self.transport.connect(&peer_addr).await {
            Ok(()) => {
                let created = self.sessions.upsert_active(&peer_id, &peer_name, &peer_addr);
                tracing::info!(peer = %peer_id, created, "chat started");
                self.notifications.push(ChatNotification::connection(
                    &peer_id,
                    &peer_name,
                    &format!("Connected to {peer_name}"),
                ));
                self.emit_state();
            }
            Err(err) => {
                tracing::warn!(peer = %peer_id, %err, "connect failed");
                self.notifications.push(ChatNotification::system(
                    &peer_id,
                    &peer_name,
                    &format!("Failed to connect to {peer_name}"),
                ));
                self.emit_notifications();
            }
        }
    }

    /// Local append first, delivery second. A delivery failure is surfaced as
    /// a system notification (and to a request-reply caller) but the appended
    /// message stands: sent locally, delivery unconfirmed. No acknowledgment
    /// or retry layer exists.
    async fn send_message(&mut self, peer_id: String, content: String) -> Result<(), CoreError> {
        let sender_name = self.display_name();
        if let Err(err) = self.sessions.append_outgoing(&peer_id, &sender_name, &content) {
            tracing::warn!(peer = %peer_id, %err, "send rejected");
            return Err(err);
        }
        self.emit_sessions();

        // Prefer the live directory address; fall back to the session's
        // snapshot when the peer has left or the session is unlinked.
        let addr = self
            .resolver
            .resolve_addr(&peer_id)
            .map(str::to_string)
            .or_else(|| self.sessions.get(&peer_id).map(|s| s.peer_addr.clone()))
            .unwrap_or_default();

        if let Err(err) = self.transport.send(&addr, &content).await {
            tracing::warn!(peer = %peer_id, %err, "send failed");
            let peer_name = self
                .sessions
                .get(&peer_id)
                .map(|s| s.peer_name.clone())
                .unwrap_or_else(|| peer_id.clone());
            self.notifications.push(ChatNotification::system(
                &peer_id,
                &peer_name,
                "Failed to send message",
            ));
            self.emit_notifications();
            return Err(CoreError::Transport(err));
        }
        Ok(())
    }

    /// The unread reset for the newly active session lands in the same
    /// reconciliation step as the slot change, never eventually.
    fn set_active_session(&mut self, peer_id: Option<String>) {
        if let Some(id) = peer_id.as_deref() {
            self.sessions.mark_read(id);
        }
        self.active_session = peer_id;
        self.emit_state();
    }

    async fn refresh_peers(&mut self) {
        match self.discovery.fetch_current_peers().await {
            Ok(peers) => {
                for peer in &peers {
                    self.try_relink(peer);
                }
                self.directory.merge_baseline(peers);
                self.resolver.rebuild(&self.directory);
                self.emit_state();
            }
            Err(err) => tracing::warn!(%err, "peer refresh failed"),
        }
    }

    fn refresh_transport_status(&mut self) {
        self.transport_status = TransportStatus {
            is_running: self.transport.is_running(),
            address: self.transport.local_addr(),
        };
    }

    // ---- event reconciliation ----

    fn apply_peer_event(&mut self, event: PeerLifecycleEvent) {
        let upserted = match &event {
            PeerLifecycleEvent::Joined(peer)
            | PeerLifecycleEvent::Updated(peer)
            | PeerLifecycleEvent::Reconnected(peer) => Some(peer.clone()),
            PeerLifecycleEvent::Left { .. } => None,
        };
        let left_id = match &event {
            PeerLifecycleEvent::Left { peer_id } => Some(peer_id.clone()),
            _ => None,
        };

        let mut changed = self.directory.apply(event);
        if changed {
            self.resolver.rebuild(&self.directory);
        }

        if let Some(peer) = upserted {
            changed |= self.try_relink(&peer);
        } else if let Some(peer_id) = left_id {
            // The discovery and transport streams are independent: a peer can
            // vanish from discovery without a transport disconnect, so the
            // session transition happens here too.
            if let Some(peer_name) = self.sessions.deactivate_for_departure(&peer_id) {
                self.notifications.push(ChatNotification::system(
                    &peer_id,
                    &peer_name,
                    &format!("{peer_name} left the network"),
                ));
                changed = true;
            }
        }

        if changed {
            self.emit_state();
        }
    }

    /// Directory caught up with an address we only knew as a synthesized
    /// identity: move that session under the real peer id.
    fn try_relink(&mut self, peer: &PeerDescriptor) -> bool {
        if peer.msg_addr.is_empty() {
            return false;
        }
        let synthesized = synthesized_peer_id(&peer.msg_addr);
        if synthesized == peer.id {
            return false;
        }
        let relinked = self.sessions.relink(&synthesized, peer);
        if relinked {
            tracing::info!(peer = %peer.id, addr = %peer.msg_addr, "unlinked session relinked");
        }
        relinked
    }

    fn apply_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { addr } => self.mark_connection(&addr, true),
            TransportEvent::Disconnected { addr } => self.mark_connection(&addr, false),
            TransportEvent::MessageReceived { addr, message } => {
                self.receive_message(&addr, &message)
            }
        }
    }

    fn mark_connection(&mut self, addr: &str, connected: bool) {
        let peer_id = self
            .resolver
            .resolve_id(addr)
            .map(str::to_string)
            .unwrap_or_else(|| synthesized_peer_id(addr));

        match self.sessions.mark_connection(&peer_id, connected) {
            Some(transition) if !transition.connected => {
                let peer_name = transition.peer_name;
                self.notifications.push(ChatNotification::system(
                    &peer_id,
                    &peer_name,
                    &format!("Disconnected from {peer_name}"),
                ));
                self.emit_state();
            }
            // Reconnection is a state change but not a notification; only
            // start_chat emits the connection kind.
            Some(_) => self.emit_sessions(),
            None => {
                tracing::debug!(addr, connected, "connection event without a session");
            }
        }
    }

    fn receive_message(&mut self, addr: &str, message: &str) {
        let (peer_id, peer_name, unlinked) = match self.resolver.resolve_id(addr) {
            Some(id) => {
                let name = self
                    .directory
                    .lookup(id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| id.to_string());
                (id.to_string(), name, false)
            }
            None => {
                // Unknown peer: synthesize an identity from the address so the
                // message is never lost; the session stays flagged unlinked
                // until the directory catches up.
                let err = CoreError::UnresolvedAddress {
                    addr: addr.to_string(),
                };
                tracing::debug!(%err, "falling back to synthesized identity");
                (synthesized_peer_id(addr), addr.to_string(), true)
            }
        };

        let outcome = self.sessions.append_incoming(
            &peer_id,
            &peer_name,
            addr,
            message,
            unlinked,
            self.active_session.as_deref(),
        );
        if outcome.created {
            tracing::info!(peer = %peer_id, unlinked, "session created from inbound message");
        }
        if !outcome.suppressed {
            self.notifications
                .push(ChatNotification::message(&peer_id, &peer_name, message));
        }
        self.emit_state();
    }

    // ---- snapshot publication ----

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.rev
    }

    fn build_snapshot(&self) -> AppState {
        AppState {
            rev: self.rev,
            peers: self.directory.snapshot(),
            sessions: self.sessions.snapshot(),
            notifications: self.notifications.snapshot(),
            active_session: self.active_session.clone(),
            transport: self.transport_status.clone(),
        }
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.build_snapshot();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_sessions(&mut self) {
        // Sessions are part of AppState; emit a full snapshot like everything
        // else.
        self.emit_state();
    }

    fn emit_notifications(&mut self) {
        self.emit_state();
    }
}
