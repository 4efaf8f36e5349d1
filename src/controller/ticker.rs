use std::sync::{Arc, Weak};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Inner, LifecycleController, lock};
use crate::core::view;
use crate::message::Message;

/// The running countdown refresher. At most one per controller.
pub(super) struct Ticker {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LifecycleController {
    /// Start the periodic countdown refresh. Does nothing if one is already running.
    pub fn mount(&self) -> bool {
        let mut slot = lock(&self.inner.ticker);
        if slot.as_ref().is_some_and(|t| !t.task.is_finished()) {
            log::debug!("Ticker already mounted");
            return false;
        }

        let (stop, mut stop_rx) = oneshot::channel();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.settings.tick_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        LifecycleController { inner }.tick_now();
                    }
                }
            }
            log::debug!("Ticker stopped");
        });

        *slot = Some(Ticker { stop, task });
        log::debug!("Ticker mounted, every {:?}", period);
        true
    }

    pub fn unmount(&self) -> bool {
        match lock(&self.inner.ticker).take() {
            Some(ticker) => {
                let _ = ticker.stop.send(());
                ticker.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.inner.ticker)
            .as_ref()
            .is_some_and(|t| !t.task.is_finished())
    }

    /// Recompute countdowns for every scheduled record and publish them.
    /// Returns the urgent count.
    pub fn tick_now(&self) -> usize {
        let (urgent, countdowns) = {
            let cache = self.cache();
            let clock = self.inner.clock.as_ref();
            (
                view::urgent_count(&cache, clock),
                view::countdowns(&cache, clock),
            )
        };
        self.publish(Message::Tick { urgent, countdowns });
        urgent
    }
}
