//! Dispatch engine.
//!
//! # Algorithm
//!
//! Each [`Scheduler::dispatch`] call advances the state machine by one step:
//!
//! 1. No active process: pop the ready head and promote it to RUNNING.
//! 2. Active process, admission semaphore busy: skip this cycle.
//! 3. With probability `io_probability`: move the active process to
//!    WAITING, park it in the I/O-wait queue with a random wait, promote the
//!    next ready process.
//! 4. Round-robin: once the quantum has elapsed, preempt to READY and
//!    requeue. Shortest-job: preempt when the ready head ranks strictly
//!    below the active process.
//!
//! A preempted process is never re-promoted in the same step: if nobody
//! else is ready, the active slot stays empty until the next dispatch.
//!
//! # Locking
//!
//! One scheduler lock serializes `admit`, `dispatch`, `switch_policy`,
//! `update_quantum`, I/O completion and retirement, and guards every PCB
//! and the active slot. Queue locks are only taken while it is held, so
//! queue capacity checks made under the scheduler lock stay valid.
//!
//! # Reference
//! Silberschatz et al. (2018), "Operating System Concepts", Ch. 5

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::queue::{IoWaitEntry, IoWaitQueue, ReadyQueue};
use super::ProcessInfo;
use crate::colony::Colony;
use crate::config::SchedulerConfig;
use crate::dispatching::{Ranked, SchedulingPolicy};
use crate::error::{Result, SimError};
use crate::models::{PcbSnapshot, ProcessControlRecord, ProcessId, ProcessState};
use crate::validation::validate_scheduler;

/// What one dispatch step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing active and nothing ready.
    Idle,
    /// A ready process was promoted into the empty active slot.
    Promoted(ProcessId),
    /// The active process keeps running.
    Continued(ProcessId),
    /// The active process's admission semaphore timed out.
    Busy(ProcessId),
    /// The active process went back to READY.
    Preempted {
        /// Process that was preempted.
        pid: ProcessId,
        /// Process promoted in its place, if any.
        next: Option<ProcessId>,
    },
    /// The active process started an I/O episode.
    IoBlocked {
        /// Process now WAITING.
        pid: ProcessId,
        /// Drawn wait.
        wait: Duration,
        /// Process promoted in its place, if any.
        next: Option<ProcessId>,
    },
    /// The scheduler has been stopped.
    Stopped,
}

/// Queue membership counts, for invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Census {
    /// Processes in the ready queue.
    pub ready: usize,
    /// Processes in the I/O-wait queue.
    pub io_wait: usize,
    /// Whether the active slot is occupied.
    pub active: bool,
    /// Admitted processes not TERMINATED.
    pub live: usize,
}

impl Census {
    /// `ready + io_wait + active == live`.
    pub fn is_balanced(&self) -> bool {
        self.ready + self.io_wait + usize::from(self.active) == self.live
    }
}

struct ActiveSlot {
    info: Arc<ProcessInfo>,
    quantum_start: Instant,
}

/// State guarded by the scheduler lock.
struct SchedulerCore {
    policy: SchedulingPolicy,
    quantum: Duration,
    last_quantum_update: Instant,
    last_policy_switch: Instant,
    active: Option<ActiveSlot>,
    pcbs: HashMap<ProcessId, ProcessControlRecord>,
    next_index: usize,
    accepting: bool,
    rng: SmallRng,
}

impl SchedulerCore {
    /// Applies a PCB transition, logging and ignoring illegal requests.
    fn transition(&mut self, pid: ProcessId, to: ProcessState, now: Instant) -> bool {
        match self.pcbs.get_mut(&pid) {
            Some(pcb) => match pcb.transition(to, now) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "transition rejected");
                    false
                }
            },
            None => {
                warn!(pid, ?to, "transition for unknown process");
                false
            }
        }
    }

    fn state_of(&self, pid: ProcessId) -> Option<ProcessState> {
        self.pcbs.get(&pid).map(|p| p.state)
    }
}

/// The scheduler context: queues, active slot, policy, quantum and PCBs.
///
/// Constructed once per simulation and shared by reference (usually an
/// `Arc`) with the dispatch loop and the two control tasks.
///
/// # Example
/// ```
/// use u_colony::colony::Colony;
/// use u_colony::config::{ColonyConfig, SchedulerConfig};
/// use u_colony::scheduler::{DispatchOutcome, Scheduler};
///
/// let scheduler = Scheduler::new(SchedulerConfig::default().with_io_probability(0.0), 1).unwrap();
/// let colony = Colony::new(0, ColonyConfig::default(), 1).unwrap();
/// assert_eq!(scheduler.admit(colony), Some(0));
/// assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));
/// ```
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    epoch: Instant,
    core: Mutex<SchedulerCore>,
    pub(super) ready: ReadyQueue,
    pub(super) io_wait: IoWaitQueue,
    pub(super) running: AtomicBool,
}

impl Scheduler {
    /// Creates a scheduler with empty queues.
    ///
    /// # Errors
    /// [`SimError::InvalidConfig`] if the configuration is inconsistent.
    pub fn new(config: SchedulerConfig, seed: u64) -> Result<Self> {
        validate_scheduler(&config).map_err(SimError::InvalidConfig)?;

        let now = Instant::now();
        Ok(Self {
            epoch: now,
            core: Mutex::new(SchedulerCore {
                policy: config.initial_policy,
                quantum: config.initial_quantum(),
                last_quantum_update: now,
                last_policy_switch: now,
                active: None,
                pcbs: HashMap::new(),
                next_index: 0,
                accepting: true,
                rng: SmallRng::seed_from_u64(seed),
            }),
            ready: ReadyQueue::new(config.ready_capacity),
            io_wait: IoWaitQueue::new(config.io_capacity),
            running: AtomicBool::new(true),
            config,
        })
    }

    /// Admits a colony as a new READY process.
    ///
    /// Returns `None`, after logging, if the scheduler is stopped, the
    /// colony was already admitted, or the ready queue is full.
    pub fn admit(&self, colony: Arc<Colony>) -> Option<ProcessId> {
        let mut core = self.core.lock();
        let pid = colony.id();

        if !core.accepting {
            warn!(pid, "admission refused: scheduler stopped");
            return None;
        }
        if core.pcbs.contains_key(&pid) {
            warn!(pid, "admission refused: already admitted");
            return None;
        }
        if self.ready.is_full() {
            warn!(pid, capacity = self.ready.capacity(), "admission dropped: ready queue full");
            return None;
        }

        let index = core.next_index;
        let info = Arc::new(ProcessInfo::new(index, colony));
        if self.ready.push(info, core.policy).is_err() {
            warn!(pid, "admission dropped: ready queue full");
            return None;
        }
        core.next_index += 1;
        core.pcbs
            .insert(pid, ProcessControlRecord::new(pid, Instant::now()));
        info!(pid, index, policy = %core.policy, "process admitted");
        Some(pid)
    }

    /// Advances the dispatch state machine by one step.
    pub fn dispatch(&self) -> DispatchOutcome {
        if !self.is_running() {
            return DispatchOutcome::Stopped;
        }

        let mut core = self.core.lock();
        let now = Instant::now();

        let Some(slot) = core.active.take() else {
            return match self.promote_next(&mut core, now) {
                Some(pid) => DispatchOutcome::Promoted(pid),
                None => DispatchOutcome::Idle,
            };
        };

        let info = Arc::clone(&slot.info);
        let pid = info.pid();
        let Some(_permit) = info.try_enter(self.config.admission_timeout()) else {
            debug!(pid, "active process busy; skipping cycle");
            core.active = Some(slot);
            return DispatchOutcome::Busy(pid);
        };

        if self.config.io_probability > 0.0 && core.rng.random_bool(self.config.io_probability) {
            if self.io_wait.is_full() {
                debug!(pid, "I/O queue full; episode skipped");
            } else {
                let wait_ms = core
                    .rng
                    .random_range(self.config.io_wait_min_ms..=self.config.io_wait_max_ms);
                let wait = Duration::from_millis(wait_ms);
                core.transition(pid, ProcessState::Waiting, now);
                if self.io_wait.push(IoWaitEntry::new(slot.info, now, wait)).is_err() {
                    warn!(pid, "I/O queue rejected a checked insertion");
                }
                let next = self.promote_next(&mut core, now);
                debug!(pid, wait_ms, ?next, "I/O episode");
                return DispatchOutcome::IoBlocked { pid, wait, next };
            }
        }

        let preempt = match core.policy {
            SchedulingPolicy::RoundRobin => now.duration_since(slot.quantum_start) >= core.quantum,
            SchedulingPolicy::ShortestJob => self
                .ready
                .head_rank()
                .is_some_and(|head| head < info.rank()),
        };

        if !preempt {
            core.active = Some(slot);
            return DispatchOutcome::Continued(pid);
        }

        // Take the successor first so the preempted process cannot win its
        // own slot back, and so the requeue below always has room.
        let successor = self.ready.pop();
        core.transition(pid, ProcessState::Ready, now);
        if self.ready.push(slot.info, core.policy).is_err() {
            warn!(pid, "ready queue rejected a requeue after pop");
        }
        let next = successor.and_then(|s| self.promote(&mut core, s, now));
        debug!(pid, ?next, policy = %core.policy, "preempted");
        DispatchOutcome::Preempted { pid, next }
    }

    /// Toggles the policy. Entering shortest-job re-sorts the ready queue.
    ///
    /// Returns the new policy.
    pub fn switch_policy(&self) -> SchedulingPolicy {
        let mut core = self.core.lock();
        self.switch_locked(&mut core, Instant::now())
    }

    /// Redraws the quantum if the update interval has elapsed.
    ///
    /// Returns the new quantum, or `None` if it is not yet time.
    pub fn update_quantum(&self) -> Option<Duration> {
        let mut core = self.core.lock();
        let now = Instant::now();
        if now.duration_since(core.last_quantum_update) < self.config.quantum_update_interval() {
            return None;
        }

        let ms = core
            .rng
            .random_range(self.config.quantum_min_ms..=self.config.quantum_max_ms);
        core.quantum = Duration::from_millis(ms);
        core.last_quantum_update = now;
        debug!(quantum_ms = ms, "quantum redrawn");
        Some(core.quantum)
    }

    /// Flips the policy if the switch interval has elapsed.
    pub fn maybe_switch_policy(&self) -> Option<SchedulingPolicy> {
        let mut core = self.core.lock();
        let now = Instant::now();
        if now.duration_since(core.last_policy_switch) < self.config.policy_switch_interval() {
            return None;
        }
        Some(self.switch_locked(&mut core, now))
    }

    /// Moves every due I/O entry back to READY.
    ///
    /// Entries whose process was retired meanwhile are discarded. If the
    /// ready queue is full, the entry stays WAITING and is retried after
    /// `io_retry_backoff_ms`. Returns the number of processes requeued.
    pub fn complete_io(&self) -> usize {
        let mut core = self.core.lock();
        let now = Instant::now();
        let mut requeued = 0;

        for mut entry in self.io_wait.take_expired(now) {
            let pid = entry.info.pid();
            if core.state_of(pid) != Some(ProcessState::Waiting) {
                continue;
            }

            if self.ready.is_full() {
                debug!(pid, "ready queue full; I/O completion deferred");
                entry.due = now + self.config.io_retry_backoff();
                if self.io_wait.push(entry).is_err() {
                    warn!(pid, "I/O queue rejected a deferred completion");
                }
                continue;
            }

            core.transition(pid, ProcessState::Ready, now);
            if self.ready.push(entry.info, core.policy).is_err() {
                warn!(pid, "ready queue rejected a checked insertion");
            }
            requeued += 1;
        }

        if requeued > 0 {
            debug!(requeued, "I/O completions");
        }
        requeued
    }

    /// Terminates a process: removes it from whichever queue or slot holds
    /// it and marks its PCB TERMINATED.
    ///
    /// Returns `false` if the process is unknown or already terminated.
    pub fn retire(&self, pid: ProcessId) -> bool {
        let mut core = self.core.lock();
        match core.state_of(pid) {
            None | Some(ProcessState::Terminated) => return false,
            Some(_) => {}
        }

        let now = Instant::now();
        if core.active.as_ref().is_some_and(|s| s.info.pid() == pid) {
            core.active = None;
        } else if self.ready.remove(pid).is_none() {
            self.io_wait.remove(pid);
        }
        core.transition(pid, ProcessState::Terminated, now);
        info!(pid, "process retired");
        true
    }

    /// Stops the scheduler: refuses new admissions, makes `dispatch` return
    /// [`DispatchOutcome::Stopped`], and wakes the I/O watcher so it exits.
    pub fn stop(&self) {
        self.core.lock().accepting = false;
        self.running.store(false, Ordering::Release);
        self.io_wait.wake_all();
        info!("scheduler stopped");
    }

    /// Terminates every process and drains both queues and the active slot.
    ///
    /// Returns the final PCB snapshots; the PCB table is discarded.
    pub fn terminate_all(&self) -> Vec<PcbSnapshot> {
        let mut core = self.core.lock();
        let now = Instant::now();

        core.active = None;
        self.ready.drain();
        self.io_wait.drain();

        let pids: Vec<ProcessId> = core.pcbs.keys().copied().collect();
        for pid in pids {
            if core.state_of(pid) != Some(ProcessState::Terminated) {
                core.transition(pid, ProcessState::Terminated, now);
            }
        }

        let mut snapshots: Vec<PcbSnapshot> =
            core.pcbs.values().map(|p| p.snapshot(self.epoch)).collect();
        snapshots.sort_by_key(|s| s.pid);
        core.pcbs.clear();
        snapshots
    }

    /// Whether the scheduler is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current policy.
    pub fn policy(&self) -> SchedulingPolicy {
        self.core.lock().policy
    }

    /// Current quantum.
    pub fn quantum(&self) -> Duration {
        self.core.lock().quantum
    }

    /// Process in the active slot.
    pub fn active_pid(&self) -> Option<ProcessId> {
        self.core.lock().active.as_ref().map(|s| s.info.pid())
    }

    /// Ready-queue process ids, head first.
    pub fn ready_pids(&self) -> Vec<ProcessId> {
        self.ready.pids()
    }

    /// Handle of an admitted, non-terminated process.
    pub fn process(&self, pid: ProcessId) -> Option<Arc<ProcessInfo>> {
        let core = self.core.lock();
        match core.active.as_ref() {
            Some(slot) if slot.info.pid() == pid => Some(Arc::clone(&slot.info)),
            _ => self.ready.get(pid).or_else(|| self.io_wait.get(pid)),
        }
    }

    /// Statistics for one process.
    pub fn snapshot(&self, pid: ProcessId) -> Option<PcbSnapshot> {
        self.core.lock().pcbs.get(&pid).map(|p| p.snapshot(self.epoch))
    }

    /// Statistics for every admitted process, ordered by pid.
    pub fn snapshots(&self) -> Vec<PcbSnapshot> {
        let core = self.core.lock();
        let mut snapshots: Vec<PcbSnapshot> =
            core.pcbs.values().map(|p| p.snapshot(self.epoch)).collect();
        snapshots.sort_by_key(|s| s.pid);
        snapshots
    }

    /// Membership counts, taken atomically under the scheduler lock.
    pub fn census(&self) -> Census {
        let core = self.core.lock();
        Census {
            ready: self.ready.len(),
            io_wait: self.io_wait.len(),
            active: core.active.is_some(),
            live: core.pcbs.values().filter(|p| !p.is_terminated()).count(),
        }
    }

    /// Whether every live process sits in exactly one place that matches
    /// its PCB state.
    pub fn membership_consistent(&self) -> bool {
        let core = self.core.lock();
        let active = core.active.as_ref().map(|s| s.info.pid());

        core.pcbs.values().all(|pcb| {
            let pid = pcb.pid;
            let places = [
                self.ready.contains(pid),
                self.io_wait.contains(pid),
                active == Some(pid),
            ];
            let count = places.iter().filter(|&&b| b).count();
            match pcb.state {
                ProcessState::Ready => count == 1 && places[0],
                ProcessState::Waiting => count == 1 && places[1],
                ProcessState::Running => count == 1 && places[2],
                ProcessState::Terminated => count == 0,
            }
        })
    }

    fn switch_locked(&self, core: &mut SchedulerCore, now: Instant) -> SchedulingPolicy {
        core.policy = core.policy.toggled();
        core.last_policy_switch = now;
        if core.policy.is_ranked() {
            self.ready.resort();
        }
        info!(policy = %core.policy, "policy switched");
        core.policy
    }

    fn promote_next(&self, core: &mut SchedulerCore, now: Instant) -> Option<ProcessId> {
        while let Some(info) = self.ready.pop() {
            if let Some(pid) = self.promote(core, info, now) {
                return Some(pid);
            }
        }
        None
    }

    fn promote(
        &self,
        core: &mut SchedulerCore,
        info: Arc<ProcessInfo>,
        now: Instant,
    ) -> Option<ProcessId> {
        let pid = info.pid();
        if !core.transition(pid, ProcessState::Running, now) {
            return None;
        }
        core.active = Some(ActiveSlot {
            info,
            quantum_start: now,
        });
        Some(pid)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("Scheduler")
            .field("policy", &core.policy)
            .field("quantum", &core.quantum)
            .field("active", &core.active.as_ref().map(|s| s.info.pid()))
            .field("ready", &self.ready.len())
            .field("io_wait", &self.io_wait.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColonyConfig;
    use std::thread;

    fn colony(id: u32, population: u64, output: u64) -> Arc<Colony> {
        let colony = Colony::new(id, ColonyConfig::default(), u64::from(id)).unwrap();
        colony.set_counters(population, output);
        colony
    }

    fn quiet() -> SchedulerConfig {
        SchedulerConfig::default().with_io_probability(0.0)
    }

    #[test]
    fn test_round_robin_preempts_after_quantum() {
        let scheduler = Scheduler::new(quiet().with_quantum(5, 5, 20), 7).unwrap();
        assert_eq!(scheduler.admit(colony(0, 20, 20)), Some(0));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Continued(0));

        thread::sleep(Duration::from_millis(10));
        assert_eq!(
            scheduler.dispatch(),
            DispatchOutcome::Preempted { pid: 0, next: None }
        );

        let pcb = scheduler.snapshot(0).unwrap();
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.iterations, 1);
        assert_eq!(scheduler.ready_pids(), vec![0]);
        assert_eq!(scheduler.active_pid(), None);

        assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));
        assert_eq!(scheduler.snapshot(0).unwrap().iterations, 2);
    }

    #[test]
    fn test_round_robin_rotates_to_next() {
        let scheduler = Scheduler::new(quiet().with_quantum(5, 5, 20), 7).unwrap();
        scheduler.admit(colony(0, 1, 1));
        scheduler.admit(colony(1, 1, 1));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));

        thread::sleep(Duration::from_millis(10));
        assert_eq!(
            scheduler.dispatch(),
            DispatchOutcome::Preempted {
                pid: 0,
                next: Some(1)
            }
        );
        assert_eq!(scheduler.active_pid(), Some(1));
        assert_eq!(scheduler.ready_pids(), vec![0]);
    }

    #[test]
    fn test_shortest_job_picks_smaller_rank() {
        for order in [[0, 1], [1, 0]] {
            let config = quiet().with_policy(SchedulingPolicy::ShortestJob);
            let scheduler = Scheduler::new(config, 3).unwrap();
            let colonies = [colony(0, 20, 20), colony(1, 30, 30)];
            for i in order {
                scheduler.admit(Arc::clone(&colonies[i]));
            }
            assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));
        }
    }

    #[test]
    fn test_shortest_job_preempts_on_strictly_smaller_head() {
        let config = quiet().with_policy(SchedulingPolicy::ShortestJob);
        let scheduler = Scheduler::new(config, 3).unwrap();
        scheduler.admit(colony(0, 25, 25));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));

        scheduler.admit(colony(1, 30, 20));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Continued(0));

        scheduler.admit(colony(2, 5, 5));
        assert_eq!(
            scheduler.dispatch(),
            DispatchOutcome::Preempted {
                pid: 0,
                next: Some(2)
            }
        );
        // 0 ties with 1 at 50; 1 was queued first
        assert_eq!(scheduler.ready_pids(), vec![1, 0]);
    }

    #[test]
    fn test_admission_dropped_when_ready_full() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        for id in 0..40 {
            assert_eq!(scheduler.admit(colony(id, 1, 1)), Some(id));
        }
        assert_eq!(scheduler.admit(colony(40, 1, 1)), None);

        let census = scheduler.census();
        assert_eq!(census.ready, 40);
        assert_eq!(census.live, 40);
        assert!(scheduler.snapshot(40).is_none());
    }

    #[test]
    fn test_duplicate_admission_refused() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        let c = colony(4, 1, 1);
        assert_eq!(scheduler.admit(Arc::clone(&c)), Some(4));
        assert_eq!(scheduler.admit(c), None);
        assert_eq!(scheduler.census().ready, 1);
    }

    #[test]
    fn test_io_episode_returns_to_ready() {
        let config = SchedulerConfig::default()
            .with_io_probability(1.0)
            .with_io_wait(30, 30);
        let scheduler = Scheduler::new(config, 9).unwrap();
        scheduler.admit(colony(0, 1, 1));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Promoted(0));
        assert_eq!(
            scheduler.dispatch(),
            DispatchOutcome::IoBlocked {
                pid: 0,
                wait: Duration::from_millis(30),
                next: None
            }
        );
        assert_eq!(scheduler.snapshot(0).unwrap().state, ProcessState::Waiting);
        assert_eq!(scheduler.complete_io(), 0);

        thread::sleep(Duration::from_millis(35));
        assert_eq!(scheduler.complete_io(), 1);

        let pcb = scheduler.snapshot(0).unwrap();
        assert_eq!(pcb.state, ProcessState::Ready);
        assert!(pcb.io_wait_total_ms >= 30);
        assert_eq!(scheduler.ready_pids(), vec![0]);
        assert!(scheduler.membership_consistent());
    }

    #[test]
    fn test_io_completion_deferred_when_ready_full() {
        let config = SchedulerConfig::default()
            .with_ready_capacity(1)
            .with_io_probability(1.0)
            .with_io_wait(1, 1);
        let scheduler = Scheduler::new(config, 9).unwrap();
        scheduler.admit(colony(0, 1, 1));
        scheduler.dispatch();
        scheduler.admit(colony(1, 1, 1));

        // 0 blocks, 1 takes the slot
        assert!(matches!(
            scheduler.dispatch(),
            DispatchOutcome::IoBlocked { pid: 0, next: Some(1), .. }
        ));
        scheduler.admit(colony(2, 1, 1));
        assert!(scheduler.ready.is_full());

        thread::sleep(Duration::from_millis(5));
        assert_eq!(scheduler.complete_io(), 0);
        assert_eq!(scheduler.snapshot(0).unwrap().state, ProcessState::Waiting);
        assert_eq!(scheduler.census().io_wait, 1);
        assert!(scheduler.census().is_balanced());
    }

    #[test]
    fn test_switch_policy_toggles_and_resorts() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        scheduler.admit(colony(0, 30, 0));
        scheduler.admit(colony(1, 10, 0));
        scheduler.admit(colony(2, 20, 0));
        assert_eq!(scheduler.ready_pids(), vec![0, 1, 2]);

        assert_eq!(scheduler.switch_policy(), SchedulingPolicy::ShortestJob);
        assert_eq!(scheduler.ready_pids(), vec![1, 2, 0]);

        assert_eq!(scheduler.switch_policy(), SchedulingPolicy::RoundRobin);
        assert_eq!(scheduler.policy(), SchedulingPolicy::RoundRobin);
        assert_eq!(scheduler.ready_pids(), vec![1, 2, 0]);
    }

    #[test]
    fn test_update_quantum_respects_interval_and_bounds() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        assert_eq!(scheduler.update_quantum(), None);
        assert_eq!(scheduler.quantum(), Duration::from_millis(10));

        let config = quiet()
            .with_quantum(7, 7, 9)
            .with_quantum_update_interval(0);
        let scheduler = Scheduler::new(config, 1).unwrap();
        for _ in 0..50 {
            let q = scheduler.update_quantum().unwrap();
            assert!(q >= Duration::from_millis(7) && q <= Duration::from_millis(9));
        }
    }

    #[test]
    fn test_maybe_switch_policy_waits_for_interval() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        assert_eq!(scheduler.maybe_switch_policy(), None);

        let scheduler = Scheduler::new(quiet().with_policy_switch_interval(0), 1).unwrap();
        assert_eq!(
            scheduler.maybe_switch_policy(),
            Some(SchedulingPolicy::ShortestJob)
        );
    }

    #[test]
    fn test_busy_gate_skips_cycle() {
        let scheduler = Scheduler::new(quiet().with_quantum(5, 5, 5), 1).unwrap();
        scheduler.admit(colony(0, 1, 1));
        scheduler.dispatch();

        let info = scheduler.process(0).unwrap();
        let held = info.try_enter(Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Busy(0));
        assert_eq!(scheduler.active_pid(), Some(0));
        drop(held);

        assert!(matches!(
            scheduler.dispatch(),
            DispatchOutcome::Preempted { pid: 0, .. }
        ));
    }

    #[test]
    fn test_retire_removes_from_every_place() {
        let config = SchedulerConfig::default()
            .with_io_probability(1.0)
            .with_io_wait(1000, 1000);
        let scheduler = Scheduler::new(config, 1).unwrap();
        scheduler.admit(colony(0, 1, 1));
        scheduler.dispatch();
        scheduler.dispatch();
        scheduler.admit(colony(1, 1, 1));
        scheduler.admit(colony(2, 1, 1));
        scheduler.dispatch();
        // 0 waiting, 1 running, 2 ready
        assert_eq!(scheduler.active_pid(), Some(1));

        assert!(scheduler.retire(0));
        assert!(scheduler.retire(1));
        assert!(scheduler.retire(2));
        assert!(!scheduler.retire(2));
        assert!(!scheduler.retire(99));

        let census = scheduler.census();
        assert_eq!(census, Census { ready: 0, io_wait: 0, active: false, live: 0 });
        assert!(scheduler.membership_consistent());
        assert_eq!(scheduler.snapshot(1).unwrap().state, ProcessState::Terminated);
    }

    #[test]
    fn test_stop_refuses_work() {
        let scheduler = Scheduler::new(quiet(), 1).unwrap();
        scheduler.admit(colony(0, 1, 1));
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.admit(colony(1, 1, 1)), None);
        assert_eq!(scheduler.dispatch(), DispatchOutcome::Stopped);

        let finals = scheduler.terminate_all();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].state, ProcessState::Terminated);
        assert_eq!(scheduler.census().live, 0);
        assert!(scheduler.snapshots().is_empty());
    }

    #[test]
    fn test_membership_invariant_under_churn() {
        let config = SchedulerConfig::default()
            .with_quantum(1, 1, 2)
            .with_quantum_update_interval(0)
            .with_io_probability(0.4)
            .with_io_wait(0, 2);
        let scheduler = Scheduler::new(config, 42).unwrap();
        for id in 0..10 {
            scheduler.admit(colony(id, u64::from(id) * 3, 1));
        }

        for step in 0..300 {
            scheduler.dispatch();
            scheduler.complete_io();
            scheduler.update_quantum();
            if step % 37 == 0 {
                scheduler.switch_policy();
            }
            if step == 150 {
                scheduler.retire(4);
            }
            let census = scheduler.census();
            assert!(census.is_balanced(), "step {step}: {census:?}");
            assert!(scheduler.membership_consistent(), "step {step}");
            assert!(census.ready <= 40 && census.io_wait <= 40);
            if step % 50 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = quiet().with_quantum(50, 5, 20);
        assert!(matches!(
            Scheduler::new(config, 1),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
