use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// How long a notification stays up unless the caller says otherwise.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One-shot cancellation attached to an undoable notification.
///
/// Clones share the same token, so whichever clone fires first wins and
/// every later call is a no-op.
#[derive(Clone)]
pub struct UndoHandle {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl UndoHandle {
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (handle, rx)
    }

    /// Returns true only for the call that actually cancelled the pending action.
    pub fn undo(&self) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|tx| tx.is_closed())
    }
}

impl fmt::Debug for UndoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHandle")
            .field("spent", &self.is_spent())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub duration: Duration,
    pub undo: Option<UndoHandle>,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            severity,
            duration: DEFAULT_DURATION,
            undo: None,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, description)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_undo(mut self, undo: UndoHandle) -> Self {
        self.undo = Some(undo);
        self
    }
}

/// Where user-facing messages go. Rendering and dismissal belong to the implementor.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only. Undo is never offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Error => log::error!("{}: {}", n.title, n.description),
            Severity::Warning => log::warn!("{}: {}", n.title, n.description),
            Severity::Info | Severity::Success => log::info!("{}: {}", n.title, n.description),
        }
    }
}

/// Forwards notifications to whichever view owns the receiver.
///
/// Dropping the receiver tears the view side down; later notifications are logged instead.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(n)) = self.tx.send(notification) {
            log::debug!("Notification receiver gone, logging instead");
            LogNotifier.notify(n);
        }
    }
}
