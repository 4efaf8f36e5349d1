use thiserror::Error;

use crate::core::capability::Action;
use crate::core::reminder::{ReminderId, ReminderStatus};
use crate::sync::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    /// A precondition the client checks itself. Never reaches the store.
    #[error("{0}")]
    Validation(String),

    #[error("cannot {action} a {status} reminder")]
    NotPermitted {
        action: Action,
        status: ReminderStatus,
    },

    #[error("reminder {0} not found")]
    NotFound(ReminderId),

    /// A store call failed; `action` is the user-facing name, e.g. "Reschedule failed".
    #[error("{action}: {source}")]
    Remote {
        action: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    pub fn remote(action: &'static str, source: RemoteError) -> Self {
        Self::Remote { action, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotPermitted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
