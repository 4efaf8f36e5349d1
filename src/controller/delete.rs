//! Delete with undo.
//!
//! Each delete runs its own small state machine on a spawned task:
//!
//! ```text
//! Idle -> Exiting -> Pending -> Confirmed
//!                           \-> Restored
//! ```
//!
//! `Exiting` keeps the record in the cache, flagged, while the view plays its
//! exit transition. `Pending` has removed it locally and offers undo for the
//! undo window. Only when the window runs out is the store asked to delete;
//! if that fails the captured copy goes back into the cache.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{LifecycleController, lock};
use crate::core::reminder::{Reminder, ReminderId};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::notify::{Notification, Severity, UndoHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletePhase {
    Exiting,
    /// Removed locally, store not told yet.
    Pending,
    Confirmed,
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The store deleted it (or it was already gone).
    Confirmed,
    /// Undone before the store was told.
    Restored,
    /// The store refused; the record is back in the cache.
    RolledBack,
}

/// Handle to one in-flight delete.
#[derive(Debug)]
pub struct DeleteTicket {
    id: ReminderId,
    undo: UndoHandle,
    task: JoinHandle<DeleteOutcome>,
}

impl DeleteTicket {
    pub fn id(&self) -> ReminderId {
        self.id
    }

    /// Same token the "Reminder deleted" notification carries.
    pub fn undo_handle(&self) -> UndoHandle {
        self.undo.clone()
    }

    pub fn undo(&self) -> bool {
        self.undo.undo()
    }

    pub async fn finished(self) -> Result<DeleteOutcome> {
        self.task
            .await
            .map_err(|e| Error::Invariant(format!("delete of reminder {} aborted: {}", self.id, e)))
    }
}

impl LifecycleController {
    pub fn delete_phase(&self, id: ReminderId) -> Option<DeletePhase> {
        lock(&self.inner.deletes).get(&id).copied()
    }

    /// Start deleting `id`. Must be called inside a tokio runtime.
    ///
    /// Only one delete per id may be in flight; a second one is an error and
    /// leaves the first untouched.
    pub fn delete(&self, id: ReminderId) -> Result<DeleteTicket> {
        let captured = {
            let mut deletes = lock(&self.inner.deletes);
            if let Some(phase) = deletes.get(&id) {
                log::error!("Delete of reminder {} requested while already {:?}", id, phase);
                return Err(Error::Invariant(format!(
                    "delete already in progress for reminder {}",
                    id
                )));
            }
            let mut cache = self.cache();
            let captured = cache.get(id).cloned().ok_or(Error::NotFound(id))?;
            cache.set_deleting(id, true);
            deletes.insert(id, DeletePhase::Exiting);
            captured
        };
        log::debug!("Delete {}: exiting", id);
        self.publish(Message::DeletePhaseChanged(id, DeletePhase::Exiting));
        self.publish(Message::RemindersChanged);

        let (undo, undo_rx) = UndoHandle::new();
        let controller = self.clone();
        let task = tokio::spawn({
            let undo = undo.clone();
            async move { controller.run_delete(captured, undo, undo_rx).await }
        });

        Ok(DeleteTicket { id, undo, task })
    }

    async fn run_delete(
        self,
        captured: Reminder,
        undo: UndoHandle,
        mut undo_rx: oneshot::Receiver<()>,
    ) -> DeleteOutcome {
        let id = captured.id;
        let settings = self.inner.settings;

        let undone = tokio::select! {
            Ok(()) = &mut undo_rx => true,
            _ = tokio::time::sleep(settings.settle_delay) => false,
        };
        if undone {
            self.cache().set_deleting(id, false);
            self.publish(Message::RemindersChanged);
            self.finish(id, DeletePhase::Restored);
            self.notify_restored(&captured);
            return DeleteOutcome::Restored;
        }

        self.cache().remove(id);
        self.set_phase(id, DeletePhase::Pending);
        self.publish(Message::RemindersChanged);
        self.notify(
            Notification::new(
                Severity::Warning,
                "Reminder deleted",
                format!("\"{}\" has been removed.", captured.title),
            )
            .with_duration(settings.undo_window)
            .with_undo(undo),
        );

        let undone = tokio::select! {
            Ok(()) = &mut undo_rx => true,
            _ = tokio::time::sleep(settings.undo_window) => false,
        };
        if undone {
            self.restore(captured.clone());
            self.finish(id, DeletePhase::Restored);
            self.notify_restored(&captured);
            return DeleteOutcome::Restored;
        }
        // Window over: later undo calls find a closed channel and do nothing.
        drop(undo_rx);

        match self.inner.store.delete(id).await {
            Ok(()) => {
                log::info!("Permanently deleted reminder {}", id);
                self.finish(id, DeletePhase::Confirmed);
                DeleteOutcome::Confirmed
            }
            Err(e) if e.is_not_found() => {
                log::info!("Reminder {} was already gone on the store", id);
                self.finish(id, DeletePhase::Confirmed);
                DeleteOutcome::Confirmed
            }
            Err(e) => {
                log::error!("Delete of reminder {} failed, restoring: {}", id, e);
                self.restore(captured);
                self.finish(id, DeletePhase::Restored);
                self.notify(Notification::error("Delete failed", e.user_message()));
                DeleteOutcome::RolledBack
            }
        }
    }

    fn restore(&self, reminder: Reminder) {
        self.cache().restore(reminder);
        self.publish(Message::RemindersChanged);
    }

    fn notify_restored(&self, reminder: &Reminder) {
        self.notify(Notification::success(
            "Reminder restored",
            format!("\"{}\" is back.", reminder.title),
        ));
    }

    fn set_phase(&self, id: ReminderId, phase: DeletePhase) {
        log::debug!("Delete {}: {:?}", id, phase);
        lock(&self.inner.deletes).insert(id, phase);
        self.publish(Message::DeletePhaseChanged(id, phase));
    }

    /// Terminal phase: announce it, then forget the id so it can be deleted again.
    fn finish(&self, id: ReminderId, phase: DeletePhase) {
        log::debug!("Delete {}: {:?}", id, phase);
        lock(&self.inner.deletes).remove(&id);
        self.publish(Message::DeletePhaseChanged(id, phase));
    }
}
