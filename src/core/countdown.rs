use chrono::NaiveDateTime;
use serde::Serialize;

/// How close a scheduled call is, bucketed for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Urgency {
    Past,
    /// Under 15 minutes away.
    Urgent15,
    /// Under an hour away.
    Urgent60,
    /// Under a day away.
    Today,
    Safe,
}

impl Urgency {
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::Urgent15 | Self::Urgent60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub label: String,
    pub urgency: Urgency,
    pub total_minutes: i64,
}

impl Countdown {
    fn past() -> Self {
        Self {
            label: "past due".to_string(),
            urgency: Urgency::Past,
            total_minutes: 0,
        }
    }
}

/// Classify the time remaining until `scheduled`.
///
/// Pure: the same inputs always give the same result, so callers can simply
/// re-run it on every tick.
pub fn classify(scheduled: NaiveDateTime, now: NaiveDateTime) -> Countdown {
    if scheduled <= now {
        return Countdown::past();
    }

    // Positive duration, so truncation is floor.
    let total_minutes = (scheduled - now).num_minutes();
    let hours = total_minutes / 60;
    let days = hours / 24;

    let (urgency, label) = if total_minutes < 15 {
        let label = if total_minutes == 0 {
            "very soon".to_string()
        } else {
            format!("in {}m", total_minutes)
        };
        (Urgency::Urgent15, label)
    } else if total_minutes < 60 {
        (Urgency::Urgent60, format!("in {}m", total_minutes))
    } else if hours < 24 {
        (Urgency::Today, format!("in {}h {}m", hours, total_minutes % 60))
    } else {
        (Urgency::Safe, format!("in {}", units(days, "day")))
    };

    Countdown {
        label,
        urgency,
        total_minutes,
    }
}

/// Long-form relative time used in confirmations ("We'll call you in 2 hours").
pub fn describe_relative(target: NaiveDateTime, now: NaiveDateTime) -> String {
    if target < now {
        return "in the past".to_string();
    }
    let minutes = (target - now).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("in {}", units(days, "day"))
    } else if hours > 0 {
        format!("in {}", units(hours, "hour"))
    } else if minutes > 0 {
        format!("in {}", units(minutes, "minute"))
    } else {
        "very soon".to_string()
    }
}

/// "Today at 3:05 PM", or "Oct 18 at 3:05 PM" when not on `now`'s date.
pub fn describe_wall_clock(target: NaiveDateTime, now: NaiveDateTime) -> String {
    let time = target.format("%-I:%M %p");
    if target.date() == now.date() {
        format!("Today at {}", time)
    } else {
        format!("{} at {}", target.format("%b %-d"), time)
    }
}

fn units(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
