//! Timer and I/O-watcher control tasks.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::Scheduler;
use crate::error::{Result, SimError};

/// Stop flag that sleeping tasks can wait on.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    fn raise(&self) {
        *self.stopped.lock() = true;
        self.changed.notify_all();
    }

    /// Sleeps for `tick` or until raised. Returns whether it was raised.
    fn wait(&self, tick: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            let _ = self.changed.wait_for(&mut stopped, tick);
        }
        *stopped
    }
}

/// Handles to the two background tasks of a running scheduler.
///
/// * the **timer** redraws the quantum and flips the policy on their
///   configured intervals;
/// * the **watcher** sleeps on the I/O-wait queue and returns due
///   processes to READY.
///
/// Dropping the handle stops both tasks and detaches them.
#[derive(Debug)]
pub struct BackgroundTasks {
    scheduler: Arc<Scheduler>,
    stop: Arc<StopSignal>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts the timer and I/O-watcher tasks.
    ///
    /// # Errors
    /// [`SimError::BackgroundSpawn`] if a thread cannot be created. Any task
    /// already started is stopped before returning.
    pub fn start_background(self: &Arc<Self>) -> Result<BackgroundTasks> {
        let mut tasks = BackgroundTasks {
            scheduler: Arc::clone(self),
            stop: Arc::new(StopSignal::default()),
            handles: Vec::with_capacity(2),
        };

        let timer = {
            let scheduler = Arc::clone(self);
            let stop = Arc::clone(&tasks.stop);
            thread::Builder::new()
                .name("scheduler-timer".into())
                .spawn(move || run_timer(&scheduler, &stop))
        };
        match timer {
            Ok(handle) => tasks.handles.push(handle),
            Err(source) => {
                return Err(SimError::BackgroundSpawn {
                    task: "timer",
                    source,
                })
            }
        }

        let watcher = {
            let scheduler = Arc::clone(self);
            thread::Builder::new()
                .name("io-watcher".into())
                .spawn(move || run_watcher(&scheduler))
        };
        match watcher {
            Ok(handle) => tasks.handles.push(handle),
            Err(source) => {
                tasks.shutdown(self.config.timer_tick() * 2);
                return Err(SimError::BackgroundSpawn {
                    task: "io-watcher",
                    source,
                });
            }
        }

        debug!("background tasks started");
        Ok(tasks)
    }
}

impl BackgroundTasks {
    /// Signals both tasks to stop and waits up to `grace` for them.
    ///
    /// Stops the scheduler as a side effect, since the watcher exits on the
    /// scheduler's running flag. Returns `true` if every task was joined.
    pub fn shutdown(&mut self, grace: Duration) -> bool {
        self.stop.raise();
        self.scheduler.stop();

        let deadline = Instant::now() + grace;
        loop {
            let (finished, pending): (Vec<_>, Vec<_>) =
                self.handles.drain(..).partition(|h| h.is_finished());
            for handle in finished {
                if handle.join().is_err() {
                    warn!("background task panicked");
                }
            }
            self.handles = pending;

            if self.handles.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(outstanding = self.handles.len(), "background tasks did not stop in time");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Number of tasks not yet joined.
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.stop.raise();
            self.scheduler.stop();
        }
    }
}

fn run_timer(scheduler: &Scheduler, stop: &StopSignal) {
    let tick = scheduler.config.timer_tick();
    while !stop.wait(tick) && scheduler.is_running() {
        scheduler.update_quantum();
        scheduler.maybe_switch_policy();
    }
    debug!("timer exited");
}

fn run_watcher(scheduler: &Scheduler) {
    let poll = scheduler.config.watcher_poll();
    while scheduler
        .io_wait
        .wait_for_expiry(&scheduler.running, poll)
    {
        scheduler.complete_io();
    }
    debug!("io watcher exited");
}
