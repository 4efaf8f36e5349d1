use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Source of "now". Injected so that time-derived state can be replayed.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Wall-clock time in the named IANA timezone.
    fn now_in(&self, timezone: &str) -> NaiveDateTime {
        self.now_utc().with_timezone(&resolve_timezone(timezone)).naive_local()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Unknown names fall back to the default zone rather than failing a whole list render.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            log::warn!("Unknown timezone {:?}, using {}", name, DEFAULT_TIMEZONE);
            chrono_tz::America::New_York
        }
    }
}
