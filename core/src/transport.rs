use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, TransportError};
use crate::Subscription;

/// Wire payload delivered by the messaging-transport subscription. Events are
/// keyed by network address; the Address Resolver maps them onto peer ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportEventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub id: String,
    pub timestamp: String,
    pub addr: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected { addr: String },
    Disconnected { addr: String },
    MessageReceived { addr: String, message: String },
}

impl TryFrom<TransportEventEnvelope> for TransportEvent {
    type Error = CoreError;

    fn try_from(envelope: TransportEventEnvelope) -> Result<Self, CoreError> {
        match envelope.event_type.as_str() {
            "Connected" => Ok(Self::Connected {
                addr: envelope.addr,
            }),
            "Disconnected" => Ok(Self::Disconnected {
                addr: envelope.addr,
            }),
            "MessageReceived" => match envelope.message {
                Some(message) => Ok(Self::MessageReceived {
                    addr: envelope.addr,
                    message,
                }),
                // A message event without a body is protocol drift too.
                None => Err(CoreError::MalformedEvent {
                    stream: "transport",
                    variant: "MessageReceived(no message)".to_string(),
                }),
            },
            other => Err(CoreError::MalformedEvent {
                stream: "transport",
                variant: other.to_string(),
            }),
        }
    }
}

/// The messaging transport boundary. The core never moves bytes; it asks the
/// transport to connect/deliver and consumes its event stream.
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn connect(&self, addr: &str) -> Result<(), TransportError>;

    async fn send(&self, addr: &str, message: &str) -> Result<(), TransportError>;

    /// Server-lifecycle queries for the local listening endpoint.
    fn is_running(&self) -> bool;
    fn local_addr(&self) -> Option<String>;

    /// Subscribe to connection/message events. Same contract as
    /// `DiscoveryService::subscribe`.
    fn subscribe(&self) -> (flume::Receiver<TransportEventEnvelope>, Subscription);
}
