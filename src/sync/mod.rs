pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::reminder::{NewReminder, Reminder, ReminderId, ReminderPatch, ReminderStatus};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status; `detail` is the backend's own message.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("reminder {0} not found")]
    NotFound(ReminderId),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Text safe to show a user. Transport internals stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the reminder service.".to_string(),
            Self::Rejected { detail, .. } => detail.clone(),
            Self::NotFound(_) => "This reminder may have been deleted.".to_string(),
            Self::Decode(_) => "The reminder service sent an unexpected response.".to_string(),
        }
    }
}

/// The system of record for reminders. Every call is fallible and may be slow.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn list(&self, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, RemoteError>;

    async fn get(&self, id: ReminderId) -> Result<Reminder, RemoteError>;

    async fn create(&self, data: &NewReminder) -> Result<Reminder, RemoteError>;

    async fn update(&self, id: ReminderId, patch: &ReminderPatch) -> Result<Reminder, RemoteError>;

    /// Deleting an id that is already gone reports `NotFound`; callers treat that as done.
    async fn delete(&self, id: ReminderId) -> Result<(), RemoteError>;
}
