use crate::core::clock::Clock;
use crate::core::models::RefreshInterval;
use chrono::{DateTime, FixedOffset};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait Scheduler: Send + Sync {
    /// Replaces any pending run with one due after `interval`.
    fn schedule_next(&self, interval: RefreshInterval);
    fn cancel(&self);
    fn can_schedule_exact(&self) -> bool;
}

/// Fires a unit message on `tx` when the pending run comes due.
///
/// Timers live on the runtime that built the scheduler, so callers on any
/// thread (D-Bus handlers included) can reschedule.
pub struct TimerScheduler {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    exact_allowed: bool,
    tx: mpsc::UnboundedSender<()>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TimerScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(clock: Arc<dyn Clock>, exact_allowed: bool, tx: mpsc::UnboundedSender<()>) -> Self {
        Self {
            runtime: Handle::current(),
            clock,
            exact_allowed,
            tx,
            pending: Mutex::new(None),
        }
    }

    fn replace_pending(&self, next: Option<JoinHandle<()>>) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = next;
    }
}

impl Scheduler for TimerScheduler {
    fn schedule_next(&self, interval: RefreshInterval) {
        let delay = if self.can_schedule_exact() {
            interval.as_duration()
        } else {
            tracing::warn!("Exact scheduling not permitted, scheduling inexact run instead");
            inexact_delay(self.clock.now(), interval)
        };

        let tx = self.tx.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("Scheduled refresh is due");
            let _ = tx.send(());
        });

        self.replace_pending(Some(handle));
        tracing::info!(%interval, ?delay, "Scheduled next refresh");
    }

    fn cancel(&self) {
        self.replace_pending(None);
        tracing::info!("Cancelled scheduled refresh");
    }

    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed
    }
}

/// Best-effort delay: the interval, pushed out to the next whole minute of
/// wall-clock time.
pub fn inexact_delay(now: DateTime<FixedOffset>, interval: RefreshInterval) -> Duration {
    let target = now + interval.as_chrono();
    let into_minute = target.timestamp_millis().rem_euclid(60_000) as u64;
    let slack = if into_minute == 0 { 0 } else { 60_000 - into_minute };
    interval.as_duration() + Duration::from_millis(slack)
}
