use std::collections::HashMap;

use crate::error::CoreError;
use crate::state::{now_millis, ChatMessage, ChatSession, PeerDescriptor};

/// What happened when an inbound message was applied; the actor turns this
/// into notification pushes.
#[derive(Debug)]
pub struct ReceiveOutcome {
    pub created: bool,
    /// True when the peer is the active session: unread stays untouched and
    /// no notification is emitted.
    pub suppressed: bool,
}

/// A real flip of a session's transport-connection flag.
#[derive(Debug)]
pub struct ConnectionTransition {
    pub peer_name: String,
    pub connected: bool,
}

/// Per-peer chat sessions: message log, unread counter, activity flag.
/// Sessions are created lazily and only ever deactivated, never deleted, for
/// the lifetime of the process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, ChatSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, peer_id: &str) -> Option<&ChatSession> {
        self.sessions.get(peer_id)
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.sessions.contains_key(peer_id)
    }

    pub fn snapshot(&self) -> HashMap<String, ChatSession> {
        self.sessions.clone()
    }

    /// Explicit user "start chat": create the session, or re-activate an
    /// existing one and refresh its denormalized peer snapshot. The message
    /// log is never touched. Returns whether a session was created.
    pub fn upsert_active(&mut self, peer_id: &str, peer_name: &str, peer_addr: &str) -> bool {
        match self.sessions.get_mut(peer_id) {
            Some(session) => {
                session.is_active = true;
                session.unlinked = false;
                session.peer_name = peer_name.to_string();
                session.peer_addr = peer_addr.to_string();
                session.last_activity = now_millis();
                false
            }
            None => {
                self.sessions.insert(
                    peer_id.to_string(),
                    ChatSession::new(peer_id, peer_name, peer_addr),
                );
                true
            }
        }
    }

    /// Append a locally authored message. The append is synchronous so the
    /// sender sees their own message immediately, independent of transport
    /// latency; delivery happens after, and its failure never retracts the
    /// append.
    pub fn append_outgoing(
        &mut self,
        peer_id: &str,
        sender_name: &str,
        content: &str,
    ) -> Result<(), CoreError> {
        let session = self
            .sessions
            .get_mut(peer_id)
            .ok_or_else(|| CoreError::NoSession {
                peer_id: peer_id.to_string(),
            })?;
        session
            .messages
            .push(ChatMessage::outgoing(sender_name, content));
        session.last_activity = now_millis();
        Ok(())
    }

    /// Append an inbound message, creating the session lazily. The unread
    /// counter grows by exactly 1 unless `peer_id` is the active session;
    /// `last_activity` is always refreshed.
    pub fn append_incoming(
        &mut self,
        peer_id: &str,
        peer_name: &str,
        peer_addr: &str,
        content: &str,
        unlinked: bool,
        active: Option<&str>,
    ) -> ReceiveOutcome {
        let created = !self.sessions.contains_key(peer_id);
        let session = self.sessions.entry(peer_id.to_string()).or_insert_with(|| {
            let mut session = ChatSession::new(peer_id, peer_name, peer_addr);
            session.unlinked = unlinked;
            session
        });

        session
            .messages
            .push(ChatMessage::incoming(peer_id, peer_name, content));
        session.last_activity = now_millis();
        // The transport just delivered from this address, so the connection
        // is evidently live.
        session.is_active = true;

        let suppressed = active == Some(peer_id);
        if !suppressed {
            session.unread_count += 1;
        }
        ReceiveOutcome { created, suppressed }
    }

    /// Set the transport-connection flag for a session; returns the
    /// transition when the flag actually flipped, `None` for repeats or for
    /// unknown sessions.
    pub fn mark_connection(
        &mut self,
        peer_id: &str,
        connected: bool,
    ) -> Option<ConnectionTransition> {
        let session = self.sessions.get_mut(peer_id)?;
        if session.is_active == connected {
            return None;
        }
        session.is_active = connected;
        Some(ConnectionTransition {
            peer_name: session.peer_name.clone(),
            connected,
        })
    }

    /// Reset the unread counter. No-op if the session is absent; returns
    /// whether anything changed.
    pub fn mark_read(&mut self, peer_id: &str) -> bool {
        match self.sessions.get_mut(peer_id) {
            Some(session) if session.unread_count > 0 => {
                session.unread_count = 0;
                true
            }
            _ => false,
        }
    }

    /// Peer vanished from the discovery directory. Deactivates its session
    /// and reports the peer name when the session was active (the caller
    /// notifies in that case); the log is retained either way.
    pub fn deactivate_for_departure(&mut self, peer_id: &str) -> Option<String> {
        let session = self.sessions.get_mut(peer_id)?;
        if !session.is_active {
            return None;
        }
        session.is_active = false;
        Some(session.peer_name.clone())
    }

    /// The directory caught up with a session that was keyed by a
    /// synthesized address identity: re-key it to the real peer id,
    /// preserving its log and unread count. When a session already exists
    /// under the real id the unlinked one is merged into it. Returns whether
    /// a relink happened.
    pub fn relink(&mut self, synthesized_id: &str, peer: &PeerDescriptor) -> bool {
        if !self
            .sessions
            .get(synthesized_id)
            .map(|s| s.unlinked)
            .unwrap_or(false)
        {
            return false;
        }
        let Some(mut orphan) = self.sessions.remove(synthesized_id) else {
            return false;
        };
        orphan.peer_id = peer.id.clone();
        orphan.peer_name = peer.name.clone();
        orphan.peer_addr = peer.msg_addr.clone();
        orphan.unlinked = false;

        match self.sessions.get_mut(&peer.id) {
            Some(existing) => {
                existing.messages.append(&mut orphan.messages);
                existing.unread_count += orphan.unread_count;
                existing.last_activity = existing.last_activity.max(orphan.last_activity);
                existing.is_active = existing.is_active || orphan.is_active;
            }
            None => {
                self.sessions.insert(peer.id.clone(), orphan);
            }
        }
        true
    }

    pub fn unread_count(&self, peer_id: &str) -> u32 {
        self.sessions
            .get(peer_id)
            .map(|s| s.unread_count)
            .unwrap_or(0)
    }

    pub fn total_unread(&self) -> u32 {
        self.sessions.values().map(|s| s.unread_count).sum()
    }
}
