//! User-facing notifications.
//!
//! The host decides how notifications are shown; the library only emits them
//! through an injected [`NotificationSink`].

use serde::Serialize;
use std::sync::Mutex;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Fire-and-forget notification channel.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, body: &str);

    fn info(&self, title: &str, body: &str) {
        self.notify(NotificationKind::Info, title, body);
    }

    fn success(&self, title: &str, body: &str) {
        self.notify(NotificationKind::Success, title, body);
    }

    fn warning(&self, title: &str, body: &str) {
        self.notify(NotificationKind::Warning, title, body);
    }

    fn error(&self, title: &str, body: &str) {
        self.notify(NotificationKind::Error, title, body);
    }
}

/// Sink that writes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, kind: NotificationKind, title: &str, body: &str) {
        match kind {
            NotificationKind::Error => log::error!("{}: {}", title, body),
            NotificationKind::Warning => log::warn!("{}: {}", title, body),
            NotificationKind::Info | NotificationKind::Success => {
                log::info!("{}: {}", title, body)
            }
        }
    }
}

/// A notification kept by [`CollectingNotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

/// Sink that keeps every notification in memory, for hosts that render a
/// notification list themselves.
#[derive(Debug, Default)]
pub struct CollectingNotificationSink {
    notifications: Mutex<Vec<Notification>>,
}

impl CollectingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(mut list) => std::mem::take(&mut *list),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for CollectingNotificationSink {
    fn notify(&self, kind: NotificationKind, title: &str, body: &str) {
        let notification = Notification {
            kind,
            title: title.to_string(),
            body: body.to_string(),
        };
        match self.notifications.lock() {
            Ok(mut list) => list.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_helpers() {
        let sink = CollectingNotificationSink::new();
        sink.success("Merged", "!7 merged");
        sink.error("Failed", "403 Forbidden");

        let collected = sink.drain();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].kind, NotificationKind::Success);
        assert_eq!(collected[1].kind, NotificationKind::Error);
        assert_eq!(collected[1].body, "403 Forbidden");
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_log_sink_accepts_all_kinds() {
        let sink = LogNotificationSink;
        sink.info("i", "b");
        sink.warning("w", "b");
        sink.notify(NotificationKind::Error, "e", "b");
    }
}
