use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::cache::ReminderCache;
use super::clock::Clock;
use super::countdown::{Countdown, classify};
use super::reminder::{Reminder, ReminderId, ReminderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReminderStatus),
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        ReminderStatus::from_str_opt(s).map(Self::Only)
    }

    pub fn matches(&self, status: ReminderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Soonest first.
    #[default]
    ScheduledTime,
    /// Newest first.
    CreatedAt,
    Title,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "due" | "scheduled" | "scheduled_time" => Some(Self::ScheduledTime),
            "created" | "created_at" => Some(Self::CreatedAt),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    fn compare(&self, a: &Reminder, b: &Reminder) -> Ordering {
        match self {
            Self::ScheduledTime => a.scheduled_time.cmp(&b.scheduled_time),
            Self::CreatedAt => b.created_at.cmp(&a.created_at),
            Self::Title => compare_titles(&a.title, &b.title),
        }
    }
}

/// Primary collation key: canonical decomposition with accents stripped, case-folded.
fn title_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// "Éclair" sorts beside "eclair" and "apple" beside "Apple". Accents, then
/// case, only break ties.
fn compare_titles(a: &str, b: &str) -> Ordering {
    title_key(a)
        .cmp(&title_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub status: StatusFilter,
    pub query: String,
    pub sort: SortKey,
}

impl ViewFilter {
    fn accepts(&self, reminder: &Reminder, needle: Option<&str>) -> bool {
        if !self.status.matches(reminder.status) {
            return false;
        }
        match needle {
            Some(needle) => {
                reminder.title.to_lowercase().contains(needle)
                    || reminder.message.to_lowercase().contains(needle)
            }
            None => true,
        }
    }
}

/// The visible, ordered subset of the cache. Stable: ties keep cache order.
pub fn project<'a>(cache: &'a ReminderCache, filter: &ViewFilter) -> Vec<&'a Reminder> {
    let query = filter.query.trim().to_lowercase();
    let needle = (!query.is_empty()).then_some(query.as_str());

    let mut visible: Vec<&Reminder> = cache
        .iter()
        .filter(|r| filter.accepts(r, needle))
        .collect();
    visible.sort_by(|a, b| filter.sort.compare(a, b));
    visible
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub failed: usize,
    pub snoozed: usize,
}

pub fn status_counts(cache: &ReminderCache) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for reminder in cache.iter() {
        counts.all += 1;
        match reminder.status {
            ReminderStatus::Scheduled => counts.scheduled += 1,
            ReminderStatus::Completed => counts.completed += 1,
            ReminderStatus::Failed => counts.failed += 1,
            ReminderStatus::Snoozed => counts.snoozed += 1,
        }
    }
    counts
}

/// Countdown for one record, measured against "now" in the record's own timezone.
pub fn countdown_for(reminder: &Reminder, clock: &dyn Clock) -> Countdown {
    classify(reminder.scheduled_time, clock.now_in(&reminder.timezone))
}

/// Countdowns for every scheduled record, in cache order.
pub fn countdowns(cache: &ReminderCache, clock: &dyn Clock) -> Vec<(ReminderId, Countdown)> {
    cache
        .iter()
        .filter(|r| r.status == ReminderStatus::Scheduled)
        .map(|r| (r.id, countdown_for(r, clock)))
        .collect()
}

/// Scheduled records strictly between 0 and 60 minutes away.
pub fn urgent_count(cache: &ReminderCache, clock: &dyn Clock) -> usize {
    countdowns(cache, clock)
        .iter()
        .filter(|(_, c)| c.total_minutes > 0 && c.total_minutes < 60)
        .count()
}
