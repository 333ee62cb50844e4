//! User-facing transient notifications.
//!
//! Stores report the outcome of every operation here; the presentation layer
//! subscribes and renders them as toasts. Nothing in this crate depends on a
//! subscriber existing.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(NoticeKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(NoticeKind::Error, message.into());
    }

    fn send(&self, kind: NoticeKind, message: String) {
        // No subscriber is not an error
        let _ = self.tx.send(Notice { kind, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(16)
    }
}
