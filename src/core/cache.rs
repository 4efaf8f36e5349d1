use std::collections::{HashMap, HashSet};

use super::reminder::{Reminder, ReminderId};

/// In-memory reminders for the current session, keyed by id.
///
/// `order` is the cache order (load order plus insertions). It is only used
/// as the tiebreak for projected views, never for identity.
#[derive(Debug, Default, Clone)]
pub struct ReminderCache {
    entries: HashMap<ReminderId, Reminder>,
    order: Vec<ReminderId>,
    /// Records in their exit transition. Cosmetic, not part of the record.
    deleting: HashSet<ReminderId>,
}

impl ReminderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a fresh list from the store.
    /// Later duplicates of an id overwrite earlier ones in place.
    pub fn replace_all(&mut self, reminders: Vec<Reminder>) {
        self.entries.clear();
        self.order.clear();
        for reminder in reminders {
            self.upsert(reminder);
        }
        self.deleting.retain(|id| self.entries.contains_key(id));
    }

    pub fn get(&self, id: ReminderId) -> Option<&Reminder> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ReminderId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace. New ids go to the end of the cache order.
    pub fn upsert(&mut self, reminder: Reminder) {
        let id = reminder.id;
        if self.entries.insert(id, reminder).is_none() {
            self.order.push(id);
        }
    }

    /// Mutate one record in place. Returns false when the id is unknown.
    pub fn modify(&mut self, id: ReminderId, f: impl FnOnce(&mut Reminder)) -> bool {
        match self.entries.get_mut(&id) {
            Some(reminder) => {
                f(reminder);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ReminderId) -> Option<Reminder> {
        let removed = self.entries.remove(&id)?;
        self.order.retain(|i| *i != id);
        self.deleting.remove(&id);
        Some(removed)
    }

    /// Put a previously removed record back, ahead of the first record
    /// scheduled later than it.
    pub fn restore(&mut self, reminder: Reminder) {
        let id = reminder.id;
        if self.entries.contains_key(&id) {
            self.entries.insert(id, reminder);
            return;
        }
        let pos = self
            .order
            .iter()
            .position(|other| {
                self.entries
                    .get(other)
                    .is_some_and(|o| o.scheduled_time > reminder.scheduled_time)
            })
            .unwrap_or(self.order.len());
        self.order.insert(pos, id);
        self.entries.insert(id, reminder);
    }

    pub fn set_deleting(&mut self, id: ReminderId, deleting: bool) {
        if deleting && self.entries.contains_key(&id) {
            self.deleting.insert(id);
        } else {
            self.deleting.remove(&id);
        }
    }

    pub fn is_deleting(&self, id: ReminderId) -> bool {
        self.deleting.contains(&id)
    }

    /// Records in cache order.
    pub fn iter(&self) -> impl Iterator<Item = &Reminder> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn snapshot(&self) -> Vec<Reminder> {
        self.iter().cloned().collect()
    }
}
