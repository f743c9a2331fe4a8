//! Bounded ready and I/O-wait queues.
//!
//! Each queue has its own lock. The scheduler takes a queue lock only while
//! already holding its own lock (never the reverse), except for the I/O
//! watcher, which waits on the I/O queue's condition variable with no other
//! lock held.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ProcessInfo;
use crate::dispatching::{sort_by_rank, RankScore, Ranked, SchedulingPolicy};
use crate::models::ProcessId;

/// Bounded queue of runnable processes.
///
/// Round-robin insertion appends. Shortest-job insertion appends and then
/// stably re-sorts the whole queue by rank. Removal always takes the head.
#[derive(Debug)]
pub struct ReadyQueue {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<ProcessInfo>>>,
}

impl ReadyQueue {
    /// Creates an empty queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Inserts a process. Hands it back if the queue is full.
    pub fn push(
        &self,
        info: Arc<ProcessInfo>,
        policy: SchedulingPolicy,
    ) -> Result<(), Arc<ProcessInfo>> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(info);
        }
        entries.push_back(info);
        if policy.is_ranked() {
            sort_by_rank(&mut *entries);
        }
        Ok(())
    }

    /// Removes the head.
    pub fn pop(&self) -> Option<Arc<ProcessInfo>> {
        self.entries.lock().pop_front()
    }

    /// Rank of the head, sampled now.
    pub fn head_rank(&self) -> Option<RankScore> {
        self.entries.lock().front().map(|p| p.rank())
    }

    /// Re-sorts by rank (entering shortest-job).
    pub fn resort(&self) {
        sort_by_rank(&mut *self.entries.lock());
    }

    /// Removes a specific process.
    pub fn remove(&self, pid: ProcessId) -> Option<Arc<ProcessInfo>> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|p| p.pid() == pid)?;
        entries.remove(pos)
    }

    /// Queued process by id, left in place.
    pub fn get(&self, pid: ProcessId) -> Option<Arc<ProcessInfo>> {
        self.entries.lock().iter().find(|p| p.pid() == pid).cloned()
    }

    /// Removes every process.
    pub fn drain(&self) -> Vec<Arc<ProcessInfo>> {
        self.entries.lock().drain(..).collect()
    }

    /// Queued process ids, head first.
    pub fn pids(&self) -> Vec<ProcessId> {
        self.entries.lock().iter().map(|p| p.pid()).collect()
    }

    /// Whether a process is queued.
    pub fn contains(&self, pid: ProcessId) -> bool {
        self.entries.lock().iter().any(|p| p.pid() == pid)
    }

    /// Number of queued processes.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether another insertion would be dropped.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Maximum number of queued processes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A process blocked on a modeled I/O episode.
#[derive(Debug, Clone)]
pub struct IoWaitEntry {
    /// The blocked process.
    pub info: Arc<ProcessInfo>,
    /// When the episode began.
    pub enqueued_at: Instant,
    /// Drawn wait duration.
    pub wait: Duration,
    /// Earliest time the watcher may complete it.
    pub due: Instant,
}

impl IoWaitEntry {
    /// Creates an entry due `wait` after `enqueued_at`.
    pub fn new(info: Arc<ProcessInfo>, enqueued_at: Instant, wait: Duration) -> Self {
        Self {
            info,
            enqueued_at,
            wait,
            due: enqueued_at + wait,
        }
    }

    /// Whether the episode may complete at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}

/// Bounded set of I/O-blocked processes with a change signal.
#[derive(Debug)]
pub struct IoWaitQueue {
    capacity: usize,
    entries: Mutex<Vec<IoWaitEntry>>,
    changed: Condvar,
}

impl IoWaitQueue {
    /// Creates an empty queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Vec::with_capacity(capacity)),
            changed: Condvar::new(),
        }
    }

    /// Inserts an entry and wakes the watcher. Hands it back if full.
    pub fn push(&self, entry: IoWaitEntry) -> Result<(), IoWaitEntry> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(entry);
        }
        entries.push(entry);
        drop(entries);
        self.changed.notify_one();
        Ok(())
    }

    /// Removes and returns every entry due at `now`.
    pub fn take_expired(&self, now: Instant) -> Vec<IoWaitEntry> {
        let mut entries = self.entries.lock();
        let (expired, pending): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|e| e.is_due(now));
        *entries = pending;
        expired
    }

    /// Removes a specific process.
    pub fn remove(&self, pid: ProcessId) -> Option<IoWaitEntry> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|e| e.info.pid() == pid)?;
        Some(entries.swap_remove(pos))
    }

    /// Blocked process by id, left in place.
    pub fn get(&self, pid: ProcessId) -> Option<Arc<ProcessInfo>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.info.pid() == pid)
            .map(|e| Arc::clone(&e.info))
    }

    /// Removes every entry.
    pub fn drain(&self) -> Vec<IoWaitEntry> {
        self.entries.lock().drain(..).collect()
    }

    /// Blocks until an entry is due or `running` is cleared.
    ///
    /// Suspends on the change signal while the queue is empty; otherwise
    /// sleeps until the earliest due time, capped at `poll`. Returns `false`
    /// once `running` is cleared.
    pub fn wait_for_expiry(&self, running: &AtomicBool, poll: Duration) -> bool {
        let mut entries = self.entries.lock();
        loop {
            if !running.load(Ordering::Acquire) {
                return false;
            }

            let now = Instant::now();
            match entries.iter().map(|e| e.due).min() {
                None => {
                    self.changed.wait(&mut entries);
                }
                Some(due) if due <= now => return true,
                Some(due) => {
                    let _ = self.changed.wait_until(&mut entries, due.min(now + poll));
                }
            }
        }
    }

    /// Wakes every waiter. Taking the lock first means a watcher that has
    /// just checked the running flag cannot miss the wake-up.
    pub fn wake_all(&self) {
        let _entries = self.entries.lock();
        self.changed.notify_all();
    }

    /// Whether a process is blocked here.
    pub fn contains(&self, pid: ProcessId) -> bool {
        self.entries.lock().iter().any(|e| e.info.pid() == pid)
    }

    /// Number of blocked processes.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether another episode would be rejected.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Maximum number of blocked processes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
