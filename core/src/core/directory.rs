use std::collections::HashMap;

use crate::discovery::PeerLifecycleEvent;
use crate::state::PeerDescriptor;

/// Mapping from stable peer id to the latest descriptor. Pure reducer over
/// the discovery lifecycle stream; side effects (resolver rebuilds, session
/// transitions) are the actor's job.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: HashMap<String, PeerDescriptor>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one lifecycle event. Upserts replace the descriptor wholesale;
    /// stale fields from a previous descriptor must not survive. Idempotent:
    /// a repeated upsert or a `Left` for an absent id changes nothing.
    /// Returns whether the mapping changed.
    pub fn apply(&mut self, event: PeerLifecycleEvent) -> bool {
        match event {
            PeerLifecycleEvent::Joined(peer)
            | PeerLifecycleEvent::Updated(peer)
            | PeerLifecycleEvent::Reconnected(peer) => {
                let changed = self.peers.get(&peer.id) != Some(&peer);
                self.peers.insert(peer.id.clone(), peer);
                changed
            }
            PeerLifecycleEvent::Left { peer_id } => self.peers.remove(&peer_id).is_some(),
        }
    }

    /// Baseline from the out-of-band bulk fetch. Applied at bootstrap before
    /// any buffered live events; last-writer-wins by id.
    pub fn merge_baseline(&mut self, peers: Vec<PeerDescriptor>) {
        for peer in peers {
            self.peers.insert(peer.id.clone(), peer);
        }
    }

    /// Callers must tolerate `None`: a session may reference a peer that has
    /// since left.
    pub fn lookup(&self, id: &str) -> Option<&PeerDescriptor> {
        self.peers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PeerDescriptor)> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, PeerDescriptor> {
        self.peers.clone()
    }
}
