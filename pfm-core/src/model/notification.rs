//! src/model/notification.rs
//! ============================================================================
//! # Notifications: user-visible messages emitted by the core
//!
//! The core never renders anything. Errors, unsupported actions and copy
//! summaries are handed to a [`NotificationSink`]; the shell decides how to
//! show them.

use std::{collections::VecDeque, time::Instant};

use compact_str::CompactString;
use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Notification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NotificationLevel {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &'static str = match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        };

        write!(f, "{s}")
    }
}

/// Compact notification with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: CompactString,
    pub level: NotificationLevel,
    pub timestamp: Instant,
}

impl Notification {
    pub fn new(message: impl Into<CompactString>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        }
    }
}

/// Receives user-visible messages from the core.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn info(&self, message: &str) {
        self.notify(Notification::new(message, NotificationLevel::Info));
    }

    fn success(&self, message: &str) {
        self.notify(Notification::new(message, NotificationLevel::Success));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::new(message, NotificationLevel::Warning));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(message, NotificationLevel::Error));
    }
}

/// Bounded queue the shell drains after each event.
#[derive(Debug)]
pub struct NotificationQueue {
    pending: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Take every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.pending.lock().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(128)
    }
}

impl NotificationSink for NotificationQueue {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                info!(level = %notification.level, "{}", notification.message);
            }
            NotificationLevel::Warning => warn!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }

        let mut pending = self.pending.lock();

        // Oldest message goes first when the shell is not draining.
        if pending.len() >= self.capacity {
            pending.pop_front();
        }

        pending.push_back(notification);
    }
}
