//! Transient user notifications ("toasts").
//!
//! Every failure in the client resolves to a visible, dismissible toast. Core
//! components push toasts into a `ToastSink`; the view layer drains the
//! receiving end and decides how long to show each one.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    pub fn label(self) -> &'static str {
        match self {
            ToastLevel::Info => "info",
            ToastLevel::Success => "ok",
            ToastLevel::Warning => "warn",
            ToastLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Sending half of the toast queue. Cheap to clone.
///
/// Sends never fail from the caller's point of view: once the view has gone
/// away there is nobody left to show the toast to.
#[derive(Debug, Clone)]
pub struct ToastSink {
    tx: mpsc::UnboundedSender<Toast>,
}

pub type ToastReceiver = mpsc::UnboundedReceiver<Toast>;

impl ToastSink {
    /// Creates a connected sink/receiver pair.
    pub fn channel() -> (Self, ToastReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn push(&self, toast: Toast) {
        tracing::debug!(level = toast.level.label(), message = %toast.message, "toast");
        let _ = self.tx.send(toast);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Toast::new(ToastLevel::Info, message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Toast::new(ToastLevel::Success, message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(Toast::new(ToastLevel::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Toast::new(ToastLevel::Error, message));
    }
}

/// Drains every toast currently queued without waiting.
pub fn drain(rx: &mut ToastReceiver) -> Vec<Toast> {
    let mut toasts = Vec::new();
    while let Ok(toast) = rx.try_recv() {
        toasts.push(toast);
    }
    toasts
}
