pub mod delete;
pub mod retry;
mod ticker;


use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::broadcast;

use crate::core::cache::ReminderCache;
use crate::core::capability::{self, Action, EditRefusal, edit_guard};
use crate::core::clock::Clock;
use crate::core::countdown::{Countdown, describe_relative, describe_wall_clock};
use crate::core::phone::{format_phone_for_display, normalize_phone};
use crate::core::reminder::{NewReminder, Reminder, ReminderId, ReminderPatch, wire_time};
use crate::core::view::{self, StatusCounts, ViewFilter};
use crate::error::{Error, Result};
use crate::message::{LoadState, Message};
use crate::notify::{Notification, Notifier};
use crate::sync::ReminderStore;

use delete::DeletePhase;
use ticker::Ticker;

/// Timing knobs for the delayed parts of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Exit transition before a deleted record leaves the cache.
    pub settle_delay: Duration,
    /// How long a delete can be undone before the store is told.
    pub undo_window: Duration,
    pub tick_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(300),
            undo_window: Duration::from_secs(5),
            tick_interval: Duration::from_secs(60),
        }
    }
}

/// Where the edit flow should go after loading a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditGate {
    Open(EditForm),
    /// Back to the list; the reason has already been notified.
    Redirect(Redirect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    NotFound,
    LoadFailed,
    Refused(EditRefusal),
}

/// Field values for an edit form, split the way the inputs want them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: ReminderId,
    pub title: String,
    pub message: String,
    pub phone_number: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub timezone: String,
}

impl EditForm {
    /// Split straight from the stored wall-clock time; no zone conversion.
    fn from_reminder(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id,
            title: reminder.title.clone(),
            message: reminder.message.clone(),
            phone_number: format_phone_for_display(&reminder.phone_number),
            date: reminder.scheduled_time.format("%Y-%m-%d").to_string(),
            time: reminder.scheduled_time.format("%H:%M").to_string(),
            timezone: reminder.timezone.clone(),
        }
    }

    pub fn scheduled_time(&self) -> Option<NaiveDateTime> {
        wire_time::parse(&format!("{}T{}", self.date.trim(), self.time.trim()))
    }

    /// The full set of form fields as an update. Status is never part of it.
    pub fn to_patch(&self) -> Result<ReminderPatch> {
        let scheduled_time = self
            .scheduled_time()
            .ok_or_else(|| Error::Validation("Choose a valid date and time".to_string()))?;
        Ok(ReminderPatch {
            title: Some(self.title.trim().to_string()),
            message: Some(self.message.trim().to_string()),
            phone_number: Some(normalize_phone(&self.phone_number)),
            scheduled_time: Some(scheduled_time),
            timezone: Some(self.timezone.clone()),
            status: None,
        })
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    cache: Mutex<ReminderCache>,
    deletes: Mutex<HashMap<ReminderId, DeletePhase>>,
    retrying: Mutex<HashSet<ReminderId>>,
    load_state: Mutex<LoadState>,
    events: broadcast::Sender<Message>,
    ticker: Mutex<Option<Ticker>>,
}

/// Owns the reminder cache and every mutation of it.
///
/// Cloning is cheap and clones share state, so delayed work (the delete
/// undo window, the tick loop) can hold its own handle.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<Inner>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                clock,
                settings,
                cache: Mutex::new(ReminderCache::new()),
                deletes: Mutex::new(HashMap::new()),
                retrying: Mutex::new(HashSet::new()),
                load_state: Mutex::new(LoadState::Idle),
                events,
                ticker: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> ControllerSettings {
        self.inner.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.inner.events.subscribe()
    }

    fn publish(&self, message: Message) {
        // No subscribers is fine.
        let _ = self.inner.events.send(message);
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    fn cache(&self) -> MutexGuard<'_, ReminderCache> {
        lock(&self.inner.cache)
    }

    fn now_for(&self, reminder: &Reminder) -> NaiveDateTime {
        self.inner.clock.now_in(&reminder.timezone)
    }

    fn pending_deletes(&self) -> HashSet<ReminderId> {
        lock(&self.inner.deletes)
            .iter()
            .filter(|(_, phase)| **phase == DeletePhase::Pending)
            .map(|(id, _)| *id)
            .collect()
    }

    fn set_load_state(&self, state: LoadState) {
        *lock(&self.inner.load_state) = state.clone();
        self.publish(Message::LoadStateChanged(state));
    }

    // --- Reads ---

    pub fn load_state(&self) -> LoadState {
        lock(&self.inner.load_state).clone()
    }

    pub fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.cache().get(id).cloned()
    }

    pub fn snapshot(&self) -> Vec<Reminder> {
        self.cache().snapshot()
    }

    pub fn visible(&self, filter: &ViewFilter) -> Vec<Reminder> {
        let cache = self.cache();
        view::project(&cache, filter).into_iter().cloned().collect()
    }

    pub fn status_counts(&self) -> StatusCounts {
        view::status_counts(&self.cache())
    }

    pub fn urgent_count(&self) -> usize {
        view::urgent_count(&self.cache(), self.inner.clock.as_ref())
    }

    pub fn countdown(&self, id: ReminderId) -> Option<Countdown> {
        let cache = self.cache();
        cache
            .get(id)
            .map(|r| view::countdown_for(r, self.inner.clock.as_ref()))
    }

    pub fn capabilities(&self, id: ReminderId) -> Option<&'static [Action]> {
        self.cache().get(id).map(|r| capability::capabilities(r.status))
    }

    pub fn is_deleting(&self, id: ReminderId) -> bool {
        self.cache().is_deleting(id)
    }

    // --- Load ---

    /// Replace the cache with the store's list.
    ///
    /// Records whose delete is waiting out the undo window are withheld so a
    /// reload cannot bring them back. A delete that was pending when the list
    /// call went out and confirmed before it returned is withheld too, since
    /// the response may predate it; one restored meanwhile is back in the
    /// cache and is kept.
    pub async fn refresh(&self) -> Result<usize> {
        self.set_load_state(LoadState::Loading);
        let pending_before = self.pending_deletes();
        match self.inner.store.list(None).await {
            Ok(reminders) => {
                let mut withheld = self.pending_deletes();
                let mut cache = self.cache();
                withheld.extend(pending_before.into_iter().filter(|id| !cache.contains(*id)));
                let reminders: Vec<Reminder> = reminders
                    .into_iter()
                    .filter(|r| !withheld.contains(&r.id))
                    .collect();
                let count = reminders.len();
                cache.replace_all(reminders);
                drop(cache);
                log::info!("Loaded {} reminders", count);
                self.set_load_state(LoadState::Loaded);
                self.publish(Message::RemindersChanged);
                Ok(count)
            }
            Err(e) => {
                log::error!("Failed to fetch reminders: {}", e);
                let message = e.user_message();
                self.set_load_state(LoadState::Failed(message.clone()));
                self.notify(Notification::error("Error", message));
                Err(Error::remote("Failed to fetch reminders", e))
            }
        }
    }

    // --- Create / edit ---

    /// Create on the store, then add the returned record to the cache.
    /// A failure has already been notified when the error comes back.
    pub async fn create(&self, data: NewReminder) -> Result<Reminder> {
        match self.inner.store.create(&data).await {
            Ok(created) => {
                let when = describe_relative(created.scheduled_time, self.now_for(&created));
                self.cache().upsert(created.clone());
                self.publish(Message::RemindersChanged);
                self.notify(Notification::success(
                    "Reminder created",
                    format!("We'll call you {}", when),
                ));
                Ok(created)
            }
            Err(e) => {
                log::error!("Error creating reminder: {}", e);
                self.notify(Notification::error("Create failed", e.user_message()));
                Err(Error::remote("Create failed", e))
            }
        }
    }

    /// Load a record for editing.
    ///
    /// The status guard runs before any form value is produced. A cached
    /// copy that is already uneditable is refused without asking the store.
    pub async fn begin_edit(&self, id: ReminderId) -> EditGate {
        if let Some(cached) = self.get(id) {
            if let Err(refusal) = edit_guard(&cached) {
                return self.refuse_edit(refusal);
            }
        }

        let reminder = match self.inner.store.get(id).await {
            Ok(r) => r,
            Err(e) if e.is_not_found() => {
                self.notify(Notification::error(
                    "Reminder not found",
                    "This reminder may have been deleted.",
                ));
                return EditGate::Redirect(Redirect::NotFound);
            }
            Err(e) => {
                log::error!("Error loading reminder {}: {}", id, e);
                self.notify(Notification::error("Failed to load reminder", "Please try again."));
                return EditGate::Redirect(Redirect::LoadFailed);
            }
        };

        if let Err(refusal) = edit_guard(&reminder) {
            return self.refuse_edit(refusal);
        }

        let form = EditForm::from_reminder(&reminder);
        {
            let mut cache = self.cache();
            if cache.contains(id) {
                cache.upsert(reminder);
            }
        }
        EditGate::Open(form)
    }

    fn refuse_edit(&self, refusal: EditRefusal) -> EditGate {
        self.notify(Notification::error(refusal.title(), refusal.description()));
        EditGate::Redirect(Redirect::Refused(refusal))
    }

    /// Save an edit. Failed records leave `failed` only through retry, so the
    /// patch may not carry a status. A record missing from the cache is
    /// fetched first so the status guard always sees it.
    pub async fn save_edit(&self, id: ReminderId, patch: ReminderPatch) -> Result<Reminder> {
        if patch.status.is_some() {
            return Err(Error::Validation(
                "Status cannot be changed from the edit form".to_string(),
            ));
        }
        let current = match self.get(id) {
            Some(cached) => cached,
            None => match self.inner.store.get(id).await {
                Ok(fetched) => fetched,
                Err(e) if e.is_not_found() => return Err(Error::NotFound(id)),
                Err(e) => {
                    log::error!("Error loading reminder {} for update: {}", id, e);
                    self.notify(Notification::error("Update failed", e.user_message()));
                    return Err(Error::remote("Update failed", e));
                }
            },
        };
        if !capability::allows(current.status, Action::Edit) {
            return Err(Error::NotPermitted {
                action: Action::Edit,
                status: current.status,
            });
        }
        if patch.is_empty() {
            return Ok(current);
        }

        match self.inner.store.update(id, &patch).await {
            Ok(updated) => {
                self.cache().upsert(updated.clone());
                self.publish(Message::RemindersChanged);
                self.notify(Notification::success(
                    "Reminder updated",
                    "Your changes have been saved.",
                ));
                Ok(updated)
            }
            Err(e) => {
                log::error!("Error updating reminder {}: {}", id, e);
                self.notify(Notification::error("Update failed", e.user_message()));
                Err(Error::remote("Update failed", e))
            }
        }
    }

    // --- Reschedule ---

    /// Move a record to `at`, wall-clock in its own timezone.
    ///
    /// Nothing changes locally until the store confirms. Unlike the other
    /// mutations the store error is returned, so a dialog can keep showing it.
    pub async fn reschedule(&self, id: ReminderId, at: NaiveDateTime) -> Result<()> {
        let current = self.get(id).ok_or(Error::NotFound(id))?;
        if !capability::allows(current.status, Action::Reschedule) {
            return Err(Error::NotPermitted {
                action: Action::Reschedule,
                status: current.status,
            });
        }

        let now = self.now_for(&current);
        if at <= now {
            return Err(Error::Validation(
                "Please select a future date and time".to_string(),
            ));
        }
        if at == current.scheduled_time {
            log::debug!("Reschedule of {} to the same time, nothing to do", id);
            return Ok(());
        }

        let patch = ReminderPatch::reschedule(at);
        match self.inner.store.update(id, &patch).await {
            Ok(updated) => {
                self.cache()
                    .modify(id, |r| r.apply(&patch, updated.updated_at));
                log::info!("Rescheduled reminder {} to {}", id, at);
                self.publish(Message::RemindersChanged);
                self.notify(Notification::success(
                    "Rescheduled",
                    format!("Reminder time has been updated to {}", describe_wall_clock(at, now)),
                ));
                Ok(())
            }
            Err(e) => {
                log::error!("Error rescheduling reminder {}: {}", id, e);
                self.notify(Notification::error("Reschedule failed", e.user_message()));
                Err(Error::remote("Reschedule failed", e))
            }
        }
    }
}
