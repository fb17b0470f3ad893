use thiserror::Error;

/// Failure reported by the messaging transport's `connect`/`send` boundary.
/// The transport is external; its errors reach us as opaque text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// `send_message` without a prior `start_chat`. Surfaced to the caller;
    /// no state is mutated.
    #[error("no chat session with peer {peer_id}; start a chat first")]
    NoSession { peer_id: String },

    /// Transport event for an address with no directory match. Always
    /// recovered by synthesizing an identity from the address, never by
    /// dropping the event.
    #[error("no peer known for address {addr}")]
    UnresolvedAddress { addr: String },

    /// Transport connect/send failure. Converted to a `System` notification;
    /// already-applied local state is not rolled back.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Unrecognized lifecycle/transport event variant. Fatal to that event
    /// only; the stream continues.
    #[error("malformed {stream} event: unknown variant {variant:?}")]
    MalformedEvent {
        stream: &'static str,
        variant: String,
    },
}
