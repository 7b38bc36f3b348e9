//! Outbound notification channel for transient user-facing messages.

use tokio::sync::mpsc;

/// Action label attached to a successful upload.
pub const COPY_LINK_ACTION: &str = "Copy link";

/// Message shown when no underlying error text is available.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// A transient confirmation or failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub action_label: Option<String>,
    pub url: Option<String>,
}

impl Notification {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action_label: None,
            url: None,
        }
    }

    /// Failure notice carrying the underlying error text.
    pub fn failure(prefix: &str, error: &dyn std::fmt::Display) -> Self {
        let detail = error.to_string();
        let detail = if detail.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            detail
        };
        Self::message(format!("{}: {}", prefix, detail))
    }

    /// Upload success notice with a copyable link.
    pub fn link(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action_label: Some(COPY_LINK_ACTION.to_string()),
            url: Some(url.into()),
        }
    }
}

/// Sending half, cloned into every job that reports back to the user.
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSender {
    pub fn send(&self, notification: Notification) {
        tracing::debug!(message = %notification.message, "Notification");
        // A dropped receiver means nobody is listening; the message is moot.
        let _ = self.tx.send(notification);
    }
}

/// Receiving half handed to the consumer of an engine.
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Notifications {
    /// Next notification, or `None` once the engine and all jobs are gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

pub fn notification_channel() -> (NotificationSender, Notifications) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, Notifications { rx })
}
