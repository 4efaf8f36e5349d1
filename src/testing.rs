//! Fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::oneshot;

use crate::controller::lock;
use crate::core::clock::Clock;
use crate::core::reminder::{NewReminder, Reminder, ReminderId, ReminderPatch, ReminderStatus};
use crate::notify::{Notification, Notifier};
use crate::sync::{ReminderStore, RemoteError};

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn at_minutes(minutes: i64) -> NaiveDateTime {
    base_time() + Duration::minutes(minutes)
}

pub fn reminder(id: i64, title: &str, status: ReminderStatus) -> Reminder {
    Reminder {
        id: ReminderId(id),
        title: title.to_string(),
        message: format!("Time for {}, don't forget", title),
        phone_number: "+14155552671".to_string(),
        scheduled_time: at_minutes(120),
        timezone: "America/New_York".to_string(),
        status,
        created_at: at_minutes(-60),
        updated_at: at_minutes(-60),
        call_sid: None,
        error_message: None,
    }
}

/// A clock frozen at a wall-clock time that is the same in every timezone.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, minutes: i64) {
        *lock(&self.now) += Duration::minutes(minutes);
    }

    pub fn now(&self) -> NaiveDateTime {
        *lock(&self.now)
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now().and_utc()
    }

    fn now_in(&self, _timezone: &str) -> NaiveDateTime {
        self.now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Get(ReminderId),
    Create,
    Update(ReminderId, ReminderPatch),
    Delete(ReminderId),
}

/// In-memory store that records every call and can be told to fail.
pub struct MockStore {
    records: Mutex<BTreeMap<ReminderId, Reminder>>,
    next_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    clock: Arc<FixedClock>,
    /// When set, the next list answers with the records as they were at call
    /// time, but only once the paired sender fires.
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub fail_list: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockStore {
    pub fn new(clock: Arc<FixedClock>, records: Vec<Reminder>) -> Self {
        let next = records.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id, r)).collect()),
            next_id: AtomicI64::new(next),
            calls: Mutex::new(Vec::new()),
            clock,
            list_gate: Mutex::new(None),
            fail_list: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Delete(_)))
            .count()
    }

    pub fn update_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update(..)))
            .count()
    }

    pub fn record(&self, id: ReminderId) -> Option<Reminder> {
        lock(&self.records).get(&id).cloned()
    }

    /// Change a record behind the controller's back.
    pub fn put(&self, reminder: Reminder) {
        lock(&self.records).insert(reminder.id, reminder);
    }

    /// Hold the next list response until the returned sender fires.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *lock(&self.list_gate) = Some(rx);
        tx
    }

    pub fn forget(&self, id: ReminderId) {
        lock(&self.records).remove(&id);
    }

    fn log(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn rejected() -> RemoteError {
        RemoteError::Rejected {
            status: 500,
            detail: "Internal server error".to_string(),
        }
    }
}

#[async_trait]
impl ReminderStore for MockStore {
    async fn list(&self, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, RemoteError> {
        self.log(Call::List);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let listed: Vec<Reminder> = lock(&self.records)
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        let gate = lock(&self.list_gate).take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(listed)
    }

    async fn get(&self, id: ReminderId) -> Result<Reminder, RemoteError> {
        self.log(Call::Get(id));
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.record(id).ok_or(RemoteError::NotFound(id))
    }

    async fn create(&self, data: &NewReminder) -> Result<Reminder, RemoteError> {
        self.log(Call::Create);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected {
                status: 422,
                detail: "phone_number: invalid".to_string(),
            });
        }
        let id = ReminderId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = self.clock.now();
        let created = Reminder {
            id,
            title: data.title.clone(),
            message: data.message.clone(),
            phone_number: data.phone_number.clone(),
            scheduled_time: data.scheduled_time,
            timezone: data.timezone.clone(),
            status: ReminderStatus::Scheduled,
            created_at: now,
            updated_at: now,
            call_sid: None,
            error_message: None,
        };
        self.put(created.clone());
        Ok(created)
    }

    async fn update(&self, id: ReminderId, patch: &ReminderPatch) -> Result<Reminder, RemoteError> {
        self.log(Call::Update(id, patch.clone()));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let mut records = lock(&self.records);
        let record = records.get_mut(&id).ok_or(RemoteError::NotFound(id))?;
        record.apply(patch, self.clock.now());
        Ok(record.clone())
    }

    async fn delete(&self, id: ReminderId) -> Result<(), RemoteError> {
        self.log(Call::Delete(id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        match lock(&self.records).remove(&id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(id)),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        lock(&self.seen).clone()
    }

    pub fn titles(&self) -> Vec<String> {
        lock(&self.seen).iter().map(|n| n.title.clone()).collect()
    }

    pub fn last(&self) -> Option<Notification> {
        lock(&self.seen).last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.seen).push(notification);
    }
}
