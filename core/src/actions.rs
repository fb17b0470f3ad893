/// User actions dispatched by the presentation layer. Each is processed to
/// completion by the core actor before the next queued message is considered.
#[derive(Debug, Clone)]
pub enum AppAction {
    // Chat
    StartChat {
        peer_id: String,
        peer_name: String,
        peer_addr: String,
    },
    SendMessage {
        peer_id: String,
        content: String,
    },
    MarkAsRead {
        peer_id: String,
    },

    // Navigation
    SetActiveSession {
        peer_id: Option<String>,
    },

    // Notifications
    DismissNotification {
        id: String,
    },

    // Reconciliation
    RefreshPeers,
    RefreshTransportStatus,
}

impl AppAction {
    /// Log-safe action tag (never includes message bodies).
    pub fn tag(&self) -> &'static str {
        match self {
            AppAction::StartChat { .. } => "StartChat",
            AppAction::SendMessage { .. } => "SendMessage",
            AppAction::MarkAsRead { .. } => "MarkAsRead",
            AppAction::SetActiveSession { .. } => "SetActiveSession",
            AppAction::DismissNotification { .. } => "DismissNotification",
            AppAction::RefreshPeers => "RefreshPeers",
            AppAction::RefreshTransportStatus => "RefreshTransportStatus",
        }
    }
}
