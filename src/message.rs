use crate::controller::delete::DeletePhase;
use crate::core::countdown::Countdown;
use crate::core::reminder::ReminderId;

/// Whether the list view has data to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Published by the controller for whatever renders the reminders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Cache contents changed; re-run the projection.
    RemindersChanged,
    LoadStateChanged(LoadState),
    DeletePhaseChanged(ReminderId, DeletePhase),
    RetryPending(ReminderId, bool),
    Tick {
        urgent: usize,
        countdowns: Vec<(ReminderId, Countdown)>,
    },
}
