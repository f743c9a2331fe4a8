//! Schedulable process handle.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

use crate::colony::Colony;
use crate::dispatching::{RankScore, Ranked};
use crate::models::ProcessId;

/// Binds a colony to its scheduling identity.
///
/// At any instant a `ProcessInfo` is held by exactly one of the ready
/// queue, the I/O-wait queue or the scheduler's active slot. Its PCB lives
/// in the scheduler's table, keyed by [`pid`](Self::pid).
pub struct ProcessInfo {
    pid: ProcessId,
    index: usize,
    colony: Arc<Colony>,
    gate: Mutex<()>,
}

impl ProcessInfo {
    pub(crate) fn new(index: usize, colony: Arc<Colony>) -> Self {
        Self {
            pid: colony.id(),
            index,
            colony,
            gate: Mutex::new(()),
        }
    }

    /// Process id (== colony id).
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Admission order; stable for the life of the process.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The colony being scheduled.
    pub fn colony(&self) -> &Arc<Colony> {
        &self.colony
    }

    /// Acquires the admission semaphore, waiting at most `timeout`.
    ///
    /// `None` means the process is busy this cycle.
    pub fn try_enter(&self, timeout: Duration) -> Option<MutexGuard<'_, ()>> {
        self.gate.try_lock_for(timeout)
    }
}

impl Ranked for ProcessInfo {
    fn rank(&self) -> RankScore {
        self.colony.rank()
    }
}

impl std::fmt::Debug for ProcessInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessInfo")
            .field("pid", &self.pid)
            .field("index", &self.index)
            .field("rank", &self.rank())
            .finish()
    }
}
