use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info};

use super::{
    local_now::Clock,
    schedule::WeeklySchedule,
    status::{status_at, StatusOptions, StatusResult},
};

/// The live schedule. Writers replace it wholesale, readers clone the `Arc`.
pub type ScheduleSender = watch::Sender<Arc<WeeklySchedule>>;
pub type ScheduleReceiver = watch::Receiver<Arc<WeeklySchedule>>;

/// Keeps a status result current while it is alive.
///
/// The periodic timer runs in a tokio task owned by this handle. Dropping the handle
/// aborts the task, so there is never a timer without an owner.
pub struct StatusMonitor {
    status: watch::Receiver<StatusResult>,
    task: JoinHandle<()>,
}

impl StatusMonitor {
    /// Evaluate once immediately, then again every `period` and whenever the schedule
    /// is replaced.
    pub fn spawn(
        mut schedule: ScheduleReceiver,
        clock: Arc<dyn Clock>,
        options: StatusOptions,
        period: Duration,
    ) -> Self {
        let initial = status_at(&schedule.borrow_and_update(), clock.now(), options);
        info!(
            open = initial.is_open,
            window = %initial.display_window,
            "initial status: {}", initial.label
        );
        let (publisher, status) = watch::channel(initial);
        let task = tokio::spawn(Self::run(schedule, clock, options, period, publisher));
        Self { status, task }
    }

    async fn run(
        mut schedule: ScheduleReceiver,
        clock: Arc<dyn Clock>,
        options: StatusOptions,
        period: Duration,
        publisher: watch::Sender<StatusResult>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately and the initial status is already published
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = schedule.changed() => {
                    if changed.is_err() {
                        debug!("schedule source dropped, stopping status monitor");
                        break;
                    }
                    debug!("schedule replaced, re-evaluating");
                }
            }

            let snapshot = Arc::clone(&schedule.borrow_and_update());
            let next = status_at(&snapshot, clock.now(), options);
            publisher.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                if current.is_open != next.is_open {
                    info!(
                        open = next.is_open,
                        window = %next.display_window,
                        "status changed: {}", next.label
                    );
                }
                *current = next;
                true
            });
        }
    }

    pub fn latest(&self) -> StatusResult {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusResult> {
        self.status.clone()
    }

    /// Stop the timer. Equivalent to dropping the handle.
    pub fn shutdown(self) {}
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
