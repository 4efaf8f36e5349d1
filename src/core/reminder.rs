use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the remote store. Never minted locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub i64);

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReminderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Scheduled,
    Completed,
    Failed,
    Snoozed,
}

impl ReminderStatus {
    pub const ALL: [ReminderStatus; 4] = [
        Self::Scheduled,
        Self::Completed,
        Self::Failed,
        Self::Snoozed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Snoozed => "snoozed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "snoozed" => Some(Self::Snoozed),
            _ => None,
        }
    }

    /// Still waiting for its call to be placed.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Snoozed)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub message: String,
    pub phone_number: String,
    /// Wall-clock time in `timezone`. Never converted by the client.
    #[serde(with = "wire_time")]
    pub scheduled_time: NaiveDateTime,
    pub timezone: String,
    pub status: ReminderStatus,
    #[serde(with = "wire_time")]
    pub created_at: NaiveDateTime,
    #[serde(with = "wire_time")]
    pub updated_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Reminder {
    /// Apply a partial update the way the store does: only the fields present change.
    pub fn apply(&mut self, patch: &ReminderPatch, updated_at: NaiveDateTime) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref message) = patch.message {
            self.message = message.clone();
        }
        if let Some(ref phone) = patch.phone_number {
            self.phone_number = phone.clone();
        }
        if let Some(time) = patch.scheduled_time {
            self.scheduled_time = time;
        }
        if let Some(ref tz) = patch.timezone {
            self.timezone = tz.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = updated_at;
    }
}

/// Payload for creating a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub message: String,
    pub phone_number: String,
    #[serde(with = "wire_time")]
    pub scheduled_time: NaiveDateTime,
    pub timezone: String,
}

/// Partial update. Absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire_time::option")]
    pub scheduled_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReminderStatus>,
}

impl ReminderPatch {
    pub fn reschedule(at: NaiveDateTime) -> Self {
        Self {
            scheduled_time: Some(at),
            ..Self::default()
        }
    }

    /// Moves a record back into the active lifecycle at `at`.
    pub fn retry(at: NaiveDateTime) -> Self {
        Self {
            scheduled_time: Some(at),
            status: Some(ReminderStatus::Scheduled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// `scheduled_time` travels as a naive ISO-8601 string ("2026-01-01T22:20:00").
pub mod wire_time {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// Accepts the backend's naive forms, with or without fractional seconds.
    /// An explicit offset is dropped, keeping the wall-clock time as written.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }

    pub fn format(time: &NaiveDateTime) -> String {
        time.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date-time: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => super::serialize(t, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            match raw {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid date-time: {}", raw))
                }),
                None => Ok(None),
            }
        }
    }
}
