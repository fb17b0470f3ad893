use crate::actions::AppAction;
use crate::discovery::PeerEventEnvelope;
use crate::error::CoreError;
use crate::state::AppState;
use crate::transport::TransportEventEnvelope;

/// State pushed to `StateObserver`s. Every mutation emits a full snapshot;
/// observers reconcile by replacing, keyed on `rev`.
#[derive(Debug, Clone)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    /// `send_message` request-reply: validated in actor order so a send
    /// queued right behind a `StartChat` sees the session that action
    /// created, and a sessionless send fails cleanly back to the caller.
    SendMessageRequest {
        peer_id: String,
        content: String,
        reply: flume::Sender<Result<(), CoreError>>,
    },
    Internal(Box<InternalEvent>),
    Shutdown,
}

/// Events delivered by the subscription forwarding tasks. Envelopes are
/// carried raw; the actor parses them so a malformed event is rejected in
/// order, inside the reconciliation step it would have occupied.
#[derive(Debug)]
pub enum InternalEvent {
    PeerEvent { envelope: PeerEventEnvelope },
    TransportEvent { envelope: TransportEventEnvelope },
}
