use crate::state::{ChatNotification, NOTIFICATION_LIMIT};

/// Bounded, newest-first queue of transient alerts. Auto-expiry of the
/// visible set is the presentation layer's concern; this queue only supports
/// independent removal by id at any time.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: Vec<ChatNotification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend, then evict the oldest past the cap.
    pub fn push(&mut self, notification: ChatNotification) {
        self.items.insert(0, notification);
        self.items.truncate(NOTIFICATION_LIMIT);
    }

    /// Remove by id, leaving the relative order of the rest unchanged.
    /// Returns whether anything was removed; dismissing an already-expired
    /// id is a no-op.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ChatNotification> {
        self.items.clone()
    }
}
