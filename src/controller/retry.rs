use std::fmt;

use chrono::{Duration as ChronoDuration, NaiveDateTime};

use super::{LifecycleController, lock};
use crate::core::capability::{self, Action};
use crate::core::reminder::{ReminderId, ReminderPatch};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::notify::Notification;

pub const MAX_CUSTOM_HOURS: u32 = 48;
pub const MAX_CUSTOM_MINUTES: u32 = 59;

/// Offset from now at which a failed call should be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryDelay {
    minutes: u32,
}

/// A one-click delay offered next to a failed reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPreset {
    pub delay: RetryDelay,
    pub label: &'static str,
    pub hint: &'static str,
}

impl RetryDelay {
    pub const QUICK: RetryDelay = RetryDelay { minutes: 5 };
    pub const SHORT_BREAK: RetryDelay = RetryDelay { minutes: 15 };
    pub const LATER: RetryDelay = RetryDelay { minutes: 60 };

    pub fn minutes(minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(Error::Validation(
                "Retry delay must be at least one minute".to_string(),
            ));
        }
        Ok(Self { minutes })
    }

    /// Hours up to 48 and minutes up to 59, not both zero.
    pub fn custom(hours: u32, minutes: u32) -> Result<Self> {
        if hours > MAX_CUSTOM_HOURS {
            return Err(Error::Validation(format!(
                "Hours must be {} or less",
                MAX_CUSTOM_HOURS
            )));
        }
        if minutes > MAX_CUSTOM_MINUTES {
            return Err(Error::Validation(format!(
                "Minutes must be {} or less",
                MAX_CUSTOM_MINUTES
            )));
        }
        Self::minutes(hours * 60 + minutes)
    }

    pub fn presets() -> [RetryPreset; 3] {
        [
            RetryPreset {
                delay: Self::QUICK,
                label: "5 minutes",
                hint: "Quick retry",
            },
            RetryPreset {
                delay: Self::SHORT_BREAK,
                label: "15 minutes",
                hint: "Short break",
            },
            RetryPreset {
                delay: Self::LATER,
                label: "1 hour",
                hint: "Try later",
            },
        ]
    }

    /// Accepts `90`, `15m`, `2h` and `1h30m`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let invalid = || Error::Validation(format!("Invalid retry delay: {}", s));

        if let Ok(minutes) = s.parse::<u32>() {
            return Self::minutes(minutes);
        }

        let (hours, rest) = match s.split_once('h') {
            Some((h, rest)) => (h.parse::<u32>().map_err(|_| invalid())?, rest),
            None => (0, s.as_str()),
        };
        let minutes = match rest.strip_suffix('m') {
            Some(m) => m.parse::<u32>().map_err(|_| invalid())?,
            None if rest.is_empty() => 0,
            None => return Err(invalid()),
        };
        if hours == 0 {
            return Self::minutes(minutes);
        }
        Self::custom(hours, minutes)
    }

    pub fn as_minutes(&self) -> u32 {
        self.minutes
    }

    pub fn as_duration(&self) -> ChronoDuration {
        ChronoDuration::minutes(i64::from(self.minutes))
    }
}

impl fmt::Display for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m) = (self.minutes / 60, self.minutes % 60);
        match (h, m) {
            (0, m) => write!(f, "{}m", m),
            (h, 0) => write!(f, "{}h", h),
            (h, m) => write!(f, "{}h{}m", h, m),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Back to `scheduled` at this wall-clock time.
    Scheduled(NaiveDateTime),
    /// The store refused; already notified.
    Failed,
}

/// Clears the pending marker however the retry ends.
struct PendingRetry<'a> {
    controller: &'a LifecycleController,
    id: ReminderId,
}

impl Drop for PendingRetry<'_> {
    fn drop(&mut self) {
        lock(&self.controller.inner.retrying).remove(&self.id);
        self.controller.publish(Message::RetryPending(self.id, false));
    }
}

impl LifecycleController {
    pub fn is_retrying(&self, id: ReminderId) -> bool {
        lock(&self.inner.retrying).contains(&id)
    }

    /// Put a failed reminder back on the schedule `delay` from now, then
    /// reload everything so the list shows what the store decided.
    pub async fn retry(&self, id: ReminderId, delay: RetryDelay) -> Result<RetryOutcome> {
        let current = self.get(id).ok_or(Error::NotFound(id))?;
        if !capability::allows(current.status, Action::Retry) {
            return Err(Error::NotPermitted {
                action: Action::Retry,
                status: current.status,
            });
        }
        if !lock(&self.inner.retrying).insert(id) {
            return Err(Error::Invariant(format!(
                "retry already in progress for reminder {}",
                id
            )));
        }
        let _pending = PendingRetry {
            controller: self,
            id,
        };
        self.publish(Message::RetryPending(id, true));

        let at = self.now_for(&current) + delay.as_duration();
        log::info!("Retrying reminder {} at {} ({} from now)", id, at, delay);

        match self.inner.store.update(id, &ReminderPatch::retry(at)).await {
            Ok(_) => {
                if let Err(e) = self.refresh().await {
                    log::warn!("Reload after retry of {} failed: {}", id, e);
                }
                self.notify(Notification::success(
                    "Retry scheduled",
                    format!("Will try again at {}", at.format("%-I:%M %p")),
                ));
                Ok(RetryOutcome::Scheduled(at))
            }
            Err(e) => {
                log::error!("Error retrying reminder {}: {}", id, e);
                self.notify(Notification::error(
                    "Retry failed",
                    "Could not reschedule reminder. Please try again.",
                ));
                Ok(RetryOutcome::Failed)
            }
        }
    }
}
