//! Pressure Timer Task
//!
//! Background task that periodically sweeps the memory cache.
//!
//! The task is parked while the store is empty and wakes one full interval
//! after the store becomes non-empty again. It reaches the cache through a
//! weak handle, so it never keeps a dropped cache alive.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheCore;

// == Timer State ==
/// Lifecycle of the pressure timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Store is empty, no sweep will fire
    Paused,
    /// A sweep fires every interval, the first one interval after scheduling
    Scheduled,
    /// Cache was dropped; terminal
    Cancelled,
}

// == Pressure Timer ==
/// Handle to the background sweep task.
#[derive(Debug)]
pub(crate) struct PressureTimer {
    state: watch::Sender<TimerState>,
    task: JoinHandle<()>,
}

impl PressureTimer {
    // == Spawn ==
    /// Spawns the timer task in the paused state.
    ///
    /// # Arguments
    /// * `runtime` - Runtime hosting the task and its sweeps
    /// * `core` - Weak handle back to the cache
    /// * `interval` - Time between sweeps while scheduled
    pub(crate) fn spawn(runtime: &Handle, core: Weak<CacheCore>, interval: Duration) -> Self {
        let (state, commands) = watch::channel(TimerState::Paused);
        let task = runtime.spawn(run(commands, core, interval));
        Self { state, task }
    }

    /// Schedules periodic sweeps; the first fires one interval from now.
    pub(crate) fn resume(&self) {
        self.transition(TimerState::Scheduled);
    }

    pub(crate) fn pause(&self) {
        self.transition(TimerState::Paused);
    }

    /// Stops the task for good.
    pub(crate) fn cancel(&self) {
        self.state.send_replace(TimerState::Cancelled);
        self.task.abort();
    }

    pub(crate) fn state(&self) -> TimerState {
        *self.state.borrow()
    }

    // Only real transitions wake the task, so repeated resumes never restart the interval.
    fn transition(&self, next: TimerState) {
        self.state.send_if_modified(|current| {
            if *current == next || *current == TimerState::Cancelled {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn run(mut commands: watch::Receiver<TimerState>, core: Weak<CacheCore>, interval: Duration) {
    info!("Starting pressure timer with interval of {:?}", interval);

    loop {
        // Park until there is something to sweep
        loop {
            match *commands.borrow_and_update() {
                TimerState::Scheduled => break,
                TimerState::Cancelled => return,
                TimerState::Paused => {}
            }
            if commands.changed().await.is_err() {
                return;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = commands.changed() => {
                if changed.is_err() {
                    return;
                }
                // Paused or re-scheduled: re-evaluate and restart the interval
                continue;
            }
        }

        let Some(cache) = core.upgrade() else {
            debug!("Pressure timer stopping: cache dropped");
            return;
        };

        match tokio::task::spawn_blocking(move || cache.sweep()).await {
            Ok(report) => debug!(
                "Timer sweep: examined {}, expired {}, lru {}, deferred {}",
                report.examined, report.expired_evicted, report.lru_evicted, report.deferred
            ),
            Err(e) => warn!("Timer sweep did not complete: {}", e),
        }
    }
}
