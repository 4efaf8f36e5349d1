use std::fmt;

use super::reminder::{Reminder, ReminderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Edit,
    Reschedule,
    Retry,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Reschedule => "reschedule",
            Self::Retry => "retry",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions offered for a record in a given status.
pub fn capabilities(status: ReminderStatus) -> &'static [Action] {
    match status {
        ReminderStatus::Scheduled => &[Action::Edit, Action::Reschedule, Action::Delete],
        ReminderStatus::Failed => &[Action::Reschedule, Action::Retry, Action::Delete],
        ReminderStatus::Completed => &[Action::Delete],
        ReminderStatus::Snoozed => &[Action::Edit, Action::Reschedule, Action::Delete],
    }
}

pub fn allows(status: ReminderStatus, action: Action) -> bool {
    capabilities(status).contains(&action)
}

/// Why the edit flow refused to open a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRefusal {
    Completed,
    Failed,
}

impl EditRefusal {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Completed => "Cannot edit completed reminder",
            Self::Failed => "Cannot edit failed reminder",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Completed => {
                "This reminder has already been completed. Create a new one instead."
            }
            Self::Failed => "This reminder has failed. Retry or reschedule it from the list instead.",
        }
    }
}

/// Runs before any form state is built from `reminder`.
pub fn edit_guard(reminder: &Reminder) -> Result<(), EditRefusal> {
    match reminder.status {
        ReminderStatus::Completed => Err(EditRefusal::Completed),
        ReminderStatus::Failed => Err(EditRefusal::Failed),
        ReminderStatus::Scheduled | ReminderStatus::Snoozed => Ok(()),
    }
}
