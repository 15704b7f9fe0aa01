//! Notification system for the TUI.

use chrono::{DateTime, Utc};

/// Most notifications kept around.
const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Bounded list of notifications; the footer shows the latest.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    items: Vec<Notification>,
}

impl Notifications {
    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) {
        if self.items.len() >= MAX_NOTIFICATIONS {
            self.items.remove(0);
        }
        self.items.push(Notification::new(level, message));
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.last()
    }

    pub fn dismiss(&mut self) {
        self.items.pop();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }
}
