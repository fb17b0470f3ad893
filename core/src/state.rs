use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard cap on the notification queue; the oldest entry is evicted on
/// overflow.
pub const NOTIFICATION_LIMIT: usize = 50;

/// Display bound for notification bodies. Longer bodies are truncated at
/// creation time, so the truncated form is what gets stored and replayed.
pub const NOTIFICATION_PREVIEW_CHARS: usize = 50;

/// How long a notification stays in the *visible* set before the
/// presentation layer should dismiss it. Expiry itself is the presentation
/// layer's job (it calls dismiss-by-id); the core only publishes the delay.
pub const NOTIFICATION_AUTO_DISMISS_MS: u64 = 5_000;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Everything the discovery service knows about one peer. Owned by the Peer
/// Directory and replaced wholesale on every lifecycle upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub id: String,
    pub name: String,
    pub instance: String,
    /// Discovery-broadcast address.
    pub addr: String,
    /// Messaging-transport address. Distinct address space from `addr`;
    /// transport events resolve against this one exclusively.
    pub msg_addr: String,
    pub version: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: i64,
    pub is_outgoing: bool,
}

impl ChatMessage {
    pub fn outgoing(sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: "self".to_string(),
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp: now_millis(),
            is_outgoing: true,
        }
    }

    pub fn incoming(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp: now_millis(),
            is_outgoing: false,
        }
    }
}

/// Local conversational state for one peer. `peer_name` and `peer_addr` are
/// denormalized snapshots, not live joins, so history survives peer
/// departure. Sessions are created lazily and never deleted for the process
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub peer_id: String,
    pub peer_name: String,
    pub peer_addr: String,
    pub messages: Vec<ChatMessage>,
    pub unread_count: u32,
    pub last_activity: i64,
    /// Transport-connection flag. Distinct from "currently viewed".
    pub is_active: bool,
    /// True when the session is keyed by a synthesized address identity
    /// because no directory entry matched the inbound address.
    pub unlinked: bool,
}

impl ChatSession {
    pub fn new(
        peer_id: impl Into<String>,
        peer_name: impl Into<String>,
        peer_addr: impl Into<String>,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            peer_name: peer_name.into(),
            peer_addr: peer_addr.into(),
            messages: Vec::new(),
            unread_count: 0,
            last_activity: now_millis(),
            is_active: true,
            unlinked: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
    Connection,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatNotification {
    pub id: String,
    pub peer_id: String,
    pub peer_name: String,
    pub message: String,
    pub timestamp: i64,
    pub kind: NotificationKind,
}

impl ChatNotification {
    fn new(
        kind: NotificationKind,
        peer_id: impl Into<String>,
        peer_name: impl Into<String>,
        body: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer_id: peer_id.into(),
            peer_name: peer_name.into(),
            message: truncate_preview(body),
            timestamp: now_millis(),
            kind,
        }
    }

    pub fn message(
        peer_id: impl Into<String>,
        peer_name: impl Into<String>,
        body: &str,
    ) -> Self {
        Self::new(NotificationKind::Message, peer_id, peer_name, body)
    }

    pub fn connection(
        peer_id: impl Into<String>,
        peer_name: impl Into<String>,
        body: &str,
    ) -> Self {
        Self::new(NotificationKind::Connection, peer_id, peer_name, body)
    }

    pub fn system(
        peer_id: impl Into<String>,
        peer_name: impl Into<String>,
        body: &str,
    ) -> Self {
        Self::new(NotificationKind::System, peer_id, peer_name, body)
    }
}

fn truncate_preview(body: &str) -> String {
    if body.chars().count() <= NOTIFICATION_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut preview: String = body.chars().take(NOTIFICATION_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Point-in-time view of the messaging transport's server lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStatus {
    pub is_running: bool,
    pub address: Option<String>,
}

/// The one cohesive state container published to the presentation layer.
/// `rev` increments on every emit so observers can detect gaps.
#[derive(Debug, Clone)]
pub struct AppState {
    pub rev: u64,
    pub peers: HashMap<String, PeerDescriptor>,
    pub sessions: HashMap<String, ChatSession>,
    /// Newest-first, bounded by `NOTIFICATION_LIMIT`.
    pub notifications: Vec<ChatNotification>,
    pub active_session: Option<String>,
    pub transport: TransportStatus,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            peers: HashMap::new(),
            sessions: HashMap::new(),
            notifications: Vec::new(),
            active_session: None,
            transport: TransportStatus::default(),
        }
    }

    pub fn total_unread_count(&self) -> u32 {
        self.sessions.values().map(|s| s.unread_count).sum()
    }
}
