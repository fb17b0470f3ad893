use std::collections::HashMap;

use super::directory::PeerDirectory;

/// Bidirectional lookup between messaging address and peer id, derived from
/// the Peer Directory. Transport events are keyed by address; domain state is
/// keyed by id; this index reconciles the two. Resolution uses the messaging
/// address exclusively; the discovery-broadcast address is a different
/// address space.
#[derive(Debug, Default)]
pub struct AddressResolver {
    id_by_addr: HashMap<String, String>,
    addr_by_id: HashMap<String, String>,
}

impl AddressResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the directory. Called after every directory change; the
    /// index is derived state and holds nothing of its own.
    pub fn rebuild(&mut self, directory: &PeerDirectory) {
        self.id_by_addr.clear();
        self.addr_by_id.clear();
        for (id, peer) in directory.iter() {
            if peer.msg_addr.is_empty() {
                continue;
            }
            self.id_by_addr.insert(peer.msg_addr.clone(), id.clone());
            self.addr_by_id.insert(id.clone(), peer.msg_addr.clone());
        }
    }

    pub fn resolve_id(&self, addr: &str) -> Option<&str> {
        self.id_by_addr.get(addr).map(String::as_str)
    }

    pub fn resolve_addr(&self, peer_id: &str) -> Option<&str> {
        self.addr_by_id.get(peer_id).map(String::as_str)
    }
}

/// Fallback identity for an inbound address with no directory match, so the
/// event is never dropped. The session it keys is flagged unlinked until the
/// directory catches up.
pub fn synthesized_peer_id(addr: &str) -> String {
    addr.chars()
        .map(|c| if c == '.' || c == ':' { '_' } else { c })
        .collect()
}
