use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::state::PeerDescriptor;
use crate::Subscription;

/// Wire payload delivered by the discovery subscription. Field names follow
/// the discovery service's JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub id: String,
    pub timestamp: String,
    pub source: String,
    pub peer: PeerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    /// Absent on `Left` events and on peers the service has not profiled yet.
    #[serde(default)]
    pub metadata: Option<PeerMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerMetadata {
    pub addr: String,
    /// Messaging-transport address; a separate address space from `addr`.
    #[serde(rename = "wsAddr", default)]
    pub ws_addr: String,
    pub name: String,
    pub instance: String,
    pub version: String,
    pub platform: String,
}

impl PeerInfo {
    /// Wholesale descriptor for the directory. Peers without metadata get
    /// empty fields; a messaging address missing from the broadcast falls
    /// back to the discovery address.
    pub fn into_descriptor(self) -> PeerDescriptor {
        let metadata = self.metadata.unwrap_or_default();
        let msg_addr = if metadata.ws_addr.is_empty() {
            metadata.addr.clone()
        } else {
            metadata.ws_addr
        };
        PeerDescriptor {
            id: self.id,
            name: metadata.name,
            instance: metadata.instance,
            addr: metadata.addr,
            msg_addr,
            version: metadata.version,
            platform: metadata.platform,
        }
    }
}

/// Typed lifecycle event. Unknown wire variants are rejected, not silently
/// ignored, so protocol drift is caught.
#[derive(Debug, Clone)]
pub enum PeerLifecycleEvent {
    Joined(PeerDescriptor),
    Updated(PeerDescriptor),
    Reconnected(PeerDescriptor),
    Left { peer_id: String },
}

impl TryFrom<PeerEventEnvelope> for PeerLifecycleEvent {
    type Error = CoreError;

    fn try_from(envelope: PeerEventEnvelope) -> Result<Self, CoreError> {
        match envelope.event_type.as_str() {
            "Joined" => Ok(Self::Joined(envelope.peer.into_descriptor())),
            "Updated" => Ok(Self::Updated(envelope.peer.into_descriptor())),
            "Reconnected" => Ok(Self::Reconnected(envelope.peer.into_descriptor())),
            "Left" => Ok(Self::Left {
                peer_id: envelope.peer.id,
            }),
            other => Err(CoreError::MalformedEvent {
                stream: "discovery",
                variant: other.to_string(),
            }),
        }
    }
}

/// The discovery service boundary. The core never discovers peers itself; it
/// consumes this stream plus the point-in-time bulk query.
#[async_trait]
pub trait DiscoveryService: Send + Sync + 'static {
    /// Subscribe to the lifecycle stream. Events buffer in the returned
    /// channel until drained; cancel the subscription to stop delivery.
    fn subscribe(&self) -> (flume::Receiver<PeerEventEnvelope>, Subscription);

    /// Bulk query of all currently known peers, used as the directory
    /// baseline at bootstrap.
    async fn fetch_current_peers(&self) -> anyhow::Result<Vec<PeerDescriptor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(event_type: &str) -> PeerEventEnvelope {
        PeerEventEnvelope {
            event_type: event_type.to_string(),
            id: "evt-1".to_string(),
            timestamp: "2026-01-10T12:00:00Z".to_string(),
            source: "mdns".to_string(),
            peer: PeerInfo {
                id: "p1".to_string(),
                metadata: Some(PeerMetadata {
                    addr: "10.0.0.5:5353".to_string(),
                    ws_addr: "10.0.0.5:9000".to_string(),
                    name: "Alice".to_string(),
                    instance: "laptop".to_string(),
                    version: "1.2.0".to_string(),
                    platform: "linux".to_string(),
                }),
            },
        }
    }

    #[test]
    fn known_variants_convert() {
        assert!(matches!(
            PeerLifecycleEvent::try_from(envelope("Joined")),
            Ok(PeerLifecycleEvent::Joined(_))
        ));
        assert!(matches!(
            PeerLifecycleEvent::try_from(envelope("Left")),
            Ok(PeerLifecycleEvent::Left { .. })
        ));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let err = PeerLifecycleEvent::try_from(envelope("Exploded")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedEvent {
                stream: "discovery",
                ..
            }
        ));
    }

    #[test]
    fn descriptor_prefers_messaging_address() {
        let Ok(PeerLifecycleEvent::Joined(peer)) = PeerLifecycleEvent::try_from(envelope("Joined"))
        else {
            panic!("expected Joined");
        };
        assert_eq!(peer.msg_addr, "10.0.0.5:9000");
        assert_eq!(peer.addr, "10.0.0.5:5353");
    }

    #[test]
    fn descriptor_falls_back_to_discovery_address() {
        let mut env = envelope("Joined");
        if let Some(meta) = env.peer.metadata.as_mut() {
            meta.ws_addr.clear();
        }
        let Ok(PeerLifecycleEvent::Joined(peer)) = PeerLifecycleEvent::try_from(env) else {
            panic!("expected Joined");
        };
        assert_eq!(peer.msg_addr, "10.0.0.5:5353");
    }

    #[test]
    fn missing_metadata_yields_empty_descriptor() {
        let mut env = envelope("Updated");
        env.peer.metadata = None;
        let Ok(PeerLifecycleEvent::Updated(peer)) = PeerLifecycleEvent::try_from(env) else {
            panic!("expected Updated");
        };
        assert_eq!(peer.id, "p1");
        assert!(peer.msg_addr.is_empty());
    }
}
