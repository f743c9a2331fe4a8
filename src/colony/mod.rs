//! Colony runtime: shared chamber, worker tasks, hatching and growth.
//!
//! # Locking
//!
//! Each colony has exactly one chamber lock guarding its chamber, its
//! worker arena and its RNG. Every chamber mutation (deposit, hatch,
//! queen-emergence check) happens under that lock, so no two of them
//! interleave on the same colony. The lock is never held while a scheduler
//! or queue lock is acquired, and never while a thread is spawned.
//!
//! Population and stored-output counters are atomics written under the
//! chamber lock and read without it. The ranking metric
//! (`population + stored_output`) therefore may be momentarily stale when
//! the scheduler samples it; it is only a comparison heuristic.
//!
//! # Lifecycle
//!
//! 1. [`Colony::new`] builds the chamber and the initial workers (the first
//!    is a queen). No thread runs yet.
//! 2. [`Colony::start`] spawns one worker task per initial worker.
//! 3. [`Colony::hatch_due`] turns due offspring into new worker tasks.
//! 4. [`Colony::terminate`] raises the termination flag; workers observe it
//!    at their next loop iteration and exit. [`Colony::join_workers`]
//!    waits for them with a deadline.

mod registry;
mod worker;

pub use registry::ColonyRegistry;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::config::ColonyConfig;
use crate::dispatching::{RankScore, Ranked};
use crate::error::{Result, SimError};
use crate::models::{ResourceChamber, WorkerArena, WorkerId, WorkerRole};
use crate::validation::validate_colony;

/// Colony identifier. Also the process id of the colony's PCB.
pub type ColonyId = u32;

/// State guarded by the chamber lock.
struct ChamberState {
    chamber: ResourceChamber,
    workers: WorkerArena,
    rng: SmallRng,
}

/// Result of one deposit by a worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    /// The worker keeps collecting.
    Continue,
    /// The worker reached its quota and is now dead.
    QuotaMet,
    /// The worker was already dead or unknown.
    Gone,
}

/// Waiting on worker tasks at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    /// Tasks that exited and were joined.
    pub joined: usize,
    /// Tasks still running when the deadline passed.
    pub outstanding: usize,
}

/// Lifecycle counters exposed for rendering and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonySnapshot {
    /// Colony id.
    pub id: ColonyId,
    /// Live workers.
    pub population: u64,
    /// Stored output units.
    pub stored_output: u64,
    /// Pending offspring units.
    pub pending_offspring: u64,
    /// Workers ever created.
    pub born: u64,
    /// Workers that died.
    pub died: u64,
    /// Workers created by hatching.
    pub hatched: u64,
    /// Queens that departed to found a colony.
    pub queen_departures: u64,
    /// Whether a growth signal is pending.
    pub growth_signal: bool,
    /// Whether the colony has been told to stop.
    pub terminated: bool,
}

/// A schedulable colony of concurrently running workers.
pub struct Colony {
    id: ColonyId,
    config: ColonyConfig,
    population: AtomicU64,
    stored_output: AtomicU64,
    pending_offspring: AtomicU64,
    born: AtomicU64,
    died: AtomicU64,
    hatched: AtomicU64,
    queen_departures: AtomicU64,
    chamber: Mutex<ChamberState>,
    terminated: AtomicBool,
    growth_signal: AtomicBool,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reaped: AtomicUsize,
}

impl Colony {
    /// Creates a colony with `config.initial_population` workers.
    ///
    /// The first worker is a queen; the rest are plain workers.
    ///
    /// # Errors
    /// [`SimError::InvalidConfig`] if `config` fails validation.
    pub fn new(id: ColonyId, config: ColonyConfig, seed: u64) -> Result<Arc<Self>> {
        validate_colony(&config).map_err(SimError::InvalidConfig)?;

        let mut rng = SmallRng::seed_from_u64(seed);
        let mut workers = WorkerArena::new();
        for i in 0..config.initial_population {
            let role = if i == 0 {
                WorkerRole::Queen
            } else {
                WorkerRole::Worker
            };
            let quota = rng.random_range(config.quota_min..=config.quota_max);
            workers.spawn(role, quota);
        }

        let population = u64::from(config.initial_population);
        Ok(Arc::new(Self {
            id,
            chamber: Mutex::new(ChamberState {
                chamber: ResourceChamber::new(config.chamber_size),
                workers,
                rng,
            }),
            config,
            population: AtomicU64::new(population),
            stored_output: AtomicU64::new(0),
            pending_offspring: AtomicU64::new(0),
            born: AtomicU64::new(population),
            died: AtomicU64::new(0),
            hatched: AtomicU64::new(0),
            queen_departures: AtomicU64::new(0),
            terminated: AtomicBool::new(false),
            growth_signal: AtomicBool::new(false),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            reaped: AtomicUsize::new(0),
        }))
    }

    /// Colony id.
    pub fn id(&self) -> ColonyId {
        self.id
    }

    /// Colony parameters.
    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// Live workers.
    pub fn population(&self) -> u64 {
        self.population.load(Ordering::Relaxed)
    }

    /// Stored output units.
    pub fn stored_output(&self) -> u64 {
        self.stored_output.load(Ordering::Relaxed)
    }

    /// Pending offspring units.
    pub fn pending_offspring(&self) -> u64 {
        self.pending_offspring.load(Ordering::Relaxed)
    }

    /// Whether the termination flag is set.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Whether the colony has no workers and nothing left to hatch.
    pub fn is_extinct(&self) -> bool {
        self.population() == 0 && self.pending_offspring() == 0
    }

    /// Spawns one task per initial worker. Later calls do nothing.
    ///
    /// # Errors
    /// [`SimError::WorkerSpawn`] if a thread cannot be created. Workers whose
    /// task failed to start are marked dead.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let launches: Vec<(WorkerId, u64)> = {
            let mut state = self.chamber.lock();
            let ids: Vec<WorkerId> = state.workers.iter().filter(|w| w.alive).map(|w| w.id).collect();
            ids.into_iter().map(|id| (id, state.rng.random())).collect()
        };

        info!(colony = self.id, workers = launches.len(), "colony started");
        self.launch(launches)
    }

    /// Raises the termination flag. Workers exit at their next iteration.
    pub fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            debug!(colony = self.id, "colony terminating");
        }
    }

    /// Records one collection by `worker` and deposits the converted output.
    ///
    /// Under the chamber lock: adds `amount` to the worker's total, stores
    /// `amount / conversion_ratio` units in a storage cell, lets a queen lay
    /// an offspring, and kills the worker once its quota is met.
    pub fn deposit(&self, worker: WorkerId, amount: u64) -> DepositOutcome {
        let mut guard = self.chamber.lock();
        let state = &mut *guard;

        let Some(record) = state.workers.get_mut(worker) else {
            return DepositOutcome::Gone;
        };
        if !record.alive {
            return DepositOutcome::Gone;
        }
        let quota_met = record.collect(amount);
        let is_queen = record.role == WorkerRole::Queen;

        let output = amount / self.config.conversion_ratio;
        if output > 0 {
            state
                .chamber
                .store_output(output, self.config.probe_attempts, &mut state.rng);
            self.stored_output.fetch_add(output, Ordering::Relaxed);
        }

        if is_queen && state.rng.random_bool(self.config.lay_probability) {
            let now = Instant::now();
            let delay = state
                .rng
                .random_range(self.config.hatch_delay_min_ms..=self.config.hatch_delay_max_ms);
            state.chamber.lay_offspring(
                now,
                now + Duration::from_millis(delay),
                self.config.probe_attempts,
                &mut state.rng,
            );
            self.pending_offspring.fetch_add(1, Ordering::Relaxed);
        }

        if quota_met {
            if let Some(record) = state.workers.get_mut(worker) {
                record.alive = false;
            }
            self.population.fetch_sub(1, Ordering::Relaxed);
            self.died.fetch_add(1, Ordering::Relaxed);
            return DepositOutcome::QuotaMet;
        }
        DepositOutcome::Continue
    }

    /// Marks a worker dead after it observed termination.
    pub(crate) fn stop_worker(&self, worker: WorkerId) {
        let mut state = self.chamber.lock();
        if let Some(record) = state.workers.get_mut(worker) {
            if record.alive {
                record.alive = false;
                self.population.fetch_sub(1, Ordering::Relaxed);
                self.died.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Hatches every offspring whose delay has elapsed (one unit per due
    /// cell) and starts a task for each new worker.
    ///
    /// Returns the number of workers hatched.
    ///
    /// # Errors
    /// [`SimError::WorkerSpawn`] if a new worker's thread cannot be created.
    pub fn hatch_due(self: &Arc<Self>) -> Result<usize> {
        self.reap_finished();
        if self.is_terminated() {
            return Ok(0);
        }

        let launches: Vec<(WorkerId, u64)> = {
            let mut guard = self.chamber.lock();
            let state = &mut *guard;
            let due = state.chamber.due_offspring(Instant::now());
            let mut launches = Vec::with_capacity(due.len());

            for pos in due {
                if !state.chamber.take_offspring(pos) {
                    continue;
                }
                let role = self.draw_role(&mut state.rng);
                let quota = state
                    .rng
                    .random_range(self.config.quota_min..=self.config.quota_max);
                let id = state.workers.spawn(role, quota);

                self.pending_offspring.fetch_sub(1, Ordering::Relaxed);
                self.population.fetch_add(1, Ordering::Relaxed);
                self.born.fetch_add(1, Ordering::Relaxed);
                self.hatched.fetch_add(1, Ordering::Relaxed);
                launches.push((id, state.rng.random()));
            }
            launches
        };

        let count = launches.len();
        if count > 0 {
            debug!(colony = self.id, hatched = count, "offspring hatched");
            self.launch(launches)?;
        }
        Ok(count)
    }

    /// Queen-emergence check.
    ///
    /// Under the chamber lock: a live queen departs with
    /// `queen_departure_probability` (and dies). Otherwise, if offspring are
    /// pending, one may be consumed with `direct_growth_probability`. Either
    /// way the growth signal is raised. Returns whether it fired.
    pub fn check_queen_emergence(&self) -> bool {
        if self.is_terminated() {
            return false;
        }

        let mut guard = self.chamber.lock();
        let state = &mut *guard;

        let departing = match state.workers.live_queen() {
            Some(queen) if state.rng.random_bool(self.config.queen_departure_probability) => {
                Some(queen)
            }
            _ => None,
        };

        let fired = if let Some(queen) = departing {
            if let Some(record) = state.workers.get_mut(queen) {
                record.alive = false;
            }
            self.population.fetch_sub(1, Ordering::Relaxed);
            self.died.fetch_add(1, Ordering::Relaxed);
            self.queen_departures.fetch_add(1, Ordering::Relaxed);
            true
        } else if self.pending_offspring() > 0
            && state.rng.random_bool(self.config.direct_growth_probability)
        {
            match state.chamber.any_offspring() {
                Some(pos) if state.chamber.take_offspring(pos) => {
                    self.pending_offspring.fetch_sub(1, Ordering::Relaxed);
                    true
                }
                _ => false,
            }
        } else {
            false
        };

        if fired {
            self.growth_signal.store(true, Ordering::Release);
            info!(colony = self.id, "growth signal raised");
        }
        fired
    }

    /// Consumes the growth signal. Returns whether it was set.
    pub fn take_growth_signal(&self) -> bool {
        self.growth_signal.swap(false, Ordering::AcqRel)
    }

    /// Waits until every worker task has exited or `deadline` passes.
    ///
    /// Tasks are never cancelled; unfinished ones stay tracked and are
    /// reported as outstanding.
    ///
    /// `joined` includes tasks already reaped while the colony ran.
    pub fn join_workers(&self, deadline: Instant) -> JoinSummary {
        let mut summary = JoinSummary {
            joined: self.reaped.swap(0, Ordering::AcqRel),
            outstanding: 0,
        };
        loop {
            let mut tasks = self.tasks.lock();
            let (finished, pending): (Vec<_>, Vec<_>) =
                tasks.drain(..).partition(|h| h.is_finished());
            *tasks = pending;
            drop(tasks);

            for handle in finished {
                // A panicked worker still counts as exited
                let _ = handle.join();
                summary.joined += 1;
            }

            let outstanding = self.tasks.lock().len();
            if outstanding == 0 || Instant::now() >= deadline {
                summary.outstanding = outstanding;
                return summary;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Whether the chamber zones are intact and the counters match it.
    pub fn is_consistent(&self) -> bool {
        let state = self.chamber.lock();
        state.chamber.zones_respected()
            && state.chamber.total_output() == self.stored_output()
            && state.chamber.total_offspring() == self.pending_offspring()
            && state.workers.alive_count() as u64 == self.population()
    }

    /// Current lifecycle counters.
    pub fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            id: self.id,
            population: self.population(),
            stored_output: self.stored_output(),
            pending_offspring: self.pending_offspring(),
            born: self.born.load(Ordering::Relaxed),
            died: self.died.load(Ordering::Relaxed),
            hatched: self.hatched.load(Ordering::Relaxed),
            queen_departures: self.queen_departures.load(Ordering::Relaxed),
            growth_signal: self.growth_signal.load(Ordering::Relaxed),
            terminated: self.is_terminated(),
        }
    }

    fn draw_role(&self, rng: &mut SmallRng) -> WorkerRole {
        let roll: f64 = rng.random();
        if roll < self.config.queen_probability {
            WorkerRole::Queen
        } else if roll < self.config.queen_probability + self.config.scout_probability {
            WorkerRole::Scout
        } else {
            WorkerRole::Worker
        }
    }

    /// Starts one task per `(worker, seed)`. Stops at the first failure and
    /// marks the failed worker and every later one dead.
    fn launch(self: &Arc<Self>, launches: Vec<(WorkerId, u64)>) -> Result<()> {
        self.reap_finished();
        for (i, &(worker_id, seed)) in launches.iter().enumerate() {
            let colony = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name(format!("colony-{}-w{}", self.id, worker_id.0))
                .spawn(move || worker::run(colony, worker_id, SmallRng::seed_from_u64(seed)));

            match spawned {
                Ok(handle) => self.tasks.lock().push(handle),
                Err(source) => {
                    for &(unstarted, _) in &launches[i..] {
                        self.stop_worker(unstarted);
                    }
                    return Err(SimError::WorkerSpawn {
                        colony: self.id,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Joins worker tasks that have already exited. Never blocks.
    fn reap_finished(&self) -> usize {
        let finished: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock();
            let (finished, pending): (Vec<_>, Vec<_>) =
                tasks.drain(..).partition(|h| h.is_finished());
            *tasks = pending;
            finished
        };

        let count = finished.len();
        for handle in finished {
            let _ = handle.join();
        }
        if count > 0 {
            self.reaped.fetch_add(count, Ordering::AcqRel);
            trace!(colony = self.id, reaped = count, "worker tasks reaped");
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn set_counters(&self, population: u64, stored_output: u64) {
        self.population.store(population, Ordering::Relaxed);
        self.stored_output.store(stored_output, Ordering::Relaxed);
    }
}

impl Ranked for Colony {
    /// `population + stored_output`, read without the chamber lock.
    fn rank(&self) -> RankScore {
        self.population().saturating_add(self.stored_output())
    }
}

impl std::fmt::Debug for Colony {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Colony")
            .field("id", &self.id)
            .field("population", &self.population())
            .field("stored_output", &self.stored_output())
            .field("pending_offspring", &self.pending_offspring())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> ColonyConfig {
        ColonyConfig::default()
            .with_initial_population(3)
            .with_quota(30, 30)
            .with_lay_probability(0.0)
            .with_growth(0.0, 0.0)
    }

    #[test]
    fn test_new_colony_has_queen() {
        let colony = Colony::new(1, quiet_config(), 42).unwrap();
        assert_eq!(colony.population(), 3);
        assert_eq!(colony.stored_output(), 0);
        assert_eq!(colony.rank(), 3);
        let state = colony.chamber.lock();
        assert_eq!(state.workers.live_queen(), Some(WorkerId(0)));
    }

    #[test]
    fn test_deposit_converts_and_discards_remainder() {
        let colony = Colony::new(1, quiet_config().with_conversion_ratio(3), 42).unwrap();
        assert_eq!(colony.deposit(WorkerId(1), 10), DepositOutcome::Continue);
        assert_eq!(colony.stored_output(), 3);
        assert_eq!(colony.deposit(WorkerId(1), 2), DepositOutcome::Continue);
        assert_eq!(colony.stored_output(), 3);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_quota_kills_worker() {
        let colony = Colony::new(1, quiet_config(), 42).unwrap();
        assert_eq!(colony.deposit(WorkerId(2), 20), DepositOutcome::Continue);
        assert_eq!(colony.deposit(WorkerId(2), 10), DepositOutcome::QuotaMet);
        assert_eq!(colony.population(), 2);
        assert_eq!(colony.deposit(WorkerId(2), 10), DepositOutcome::Gone);
        assert_eq!(colony.deposit(WorkerId(99), 10), DepositOutcome::Gone);
        assert_eq!(colony.snapshot().died, 1);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_queen_lays_and_offspring_hatch() {
        let mut config = quiet_config().with_lay_probability(1.0).with_hatch_delay(0, 0);
        config.queen_probability = 0.0;
        let colony = Colony::new(1, config, 7).unwrap();

        // Only the queen lays
        colony.deposit(WorkerId(1), 3);
        assert_eq!(colony.pending_offspring(), 0);
        colony.deposit(WorkerId(0), 3);
        assert_eq!(colony.pending_offspring(), 1);
        assert!(colony.is_consistent());

        let hatched = colony.hatch_due().unwrap();
        assert_eq!(hatched, 1);
        assert_eq!(colony.pending_offspring(), 0);
        assert_eq!(colony.snapshot().hatched, 1);
        assert_eq!(colony.snapshot().born, 4);

        colony.terminate();
        let summary = colony.join_workers(Instant::now() + Duration::from_secs(5));
        assert_eq!(summary.outstanding, 0);
        assert_eq!(summary.joined, 1);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_queen_departure_fires_growth() {
        let config = quiet_config().with_growth(1.0, 0.0);
        let colony = Colony::new(1, config, 42).unwrap();

        assert!(colony.check_queen_emergence());
        assert_eq!(colony.population(), 2);
        assert_eq!(colony.snapshot().queen_departures, 1);
        assert!(colony.take_growth_signal());
        assert!(!colony.take_growth_signal());

        // No queen left and nothing pending
        assert!(!colony.check_queen_emergence());
    }

    #[test]
    fn test_direct_growth_consumes_offspring() {
        let config = quiet_config()
            .with_lay_probability(1.0)
            .with_hatch_delay(10_000, 10_000)
            .with_growth(0.0, 1.0);
        let colony = Colony::new(1, config, 42).unwrap();
        colony.deposit(WorkerId(0), 3);
        assert_eq!(colony.pending_offspring(), 1);

        assert!(colony.check_queen_emergence());
        assert_eq!(colony.pending_offspring(), 0);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_terminated_colony_ignores_growth_and_hatch() {
        let config = quiet_config().with_growth(1.0, 1.0);
        let colony = Colony::new(1, config, 42).unwrap();
        colony.terminate();
        assert!(!colony.check_queen_emergence());
        assert_eq!(colony.hatch_due().unwrap(), 0);
    }

    #[test]
    fn test_workers_run_to_quota() {
        let config = quiet_config()
            .with_quota(5, 5)
            .with_collect_delay(0, 1);
        let colony = Colony::new(4, config, 11).unwrap();
        colony.start().unwrap();

        let summary = colony.join_workers(Instant::now() + Duration::from_secs(10));
        assert_eq!(summary.joined, 3);
        assert_eq!(summary.outstanding, 0);
        assert_eq!(colony.population(), 0);
        assert!(colony.is_extinct());
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_terminate_stops_workers_cooperatively() {
        let config = quiet_config()
            .with_quota(1_000_000, 1_000_000)
            .with_collect_delay(1, 2);
        let colony = Colony::new(5, config, 3).unwrap();
        colony.start().unwrap();
        // Second start is a no-op
        colony.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        colony.terminate();
        let summary = colony.join_workers(Instant::now() + Duration::from_secs(5));
        assert_eq!(summary.joined, 3);
        assert_eq!(summary.outstanding, 0);
        assert_eq!(colony.population(), 0);
        assert!(colony.stored_output() > 0);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_concurrent_deposits_keep_counters_consistent() {
        let config = quiet_config()
            .with_initial_population(8)
            .with_quota(200, 400)
            .with_collect_delay(0, 0)
            .with_lay_probability(0.5)
            .with_hatch_delay(0, 5);
        let colony = Colony::new(6, config, 99).unwrap();
        colony.start().unwrap();

        for _ in 0..20 {
            colony.hatch_due().unwrap();
            assert!(colony.is_consistent());
            thread::sleep(Duration::from_millis(1));
        }

        colony.terminate();
        let summary = colony.join_workers(Instant::now() + Duration::from_secs(10));
        assert_eq!(summary.outstanding, 0);
        assert!(colony.is_consistent());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let inverted_quota = quiet_config().with_quota(30, 10);
        let no_ratio = quiet_config().with_conversion_ratio(0);
        let tiny_chamber = quiet_config().with_chamber_size(3);

        for config in [inverted_quota, no_ratio, tiny_chamber] {
            assert!(matches!(
                Colony::new(1, config, 42),
                Err(SimError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_finished_workers_reaped_on_hatch() {
        let config = quiet_config()
            .with_initial_population(6)
            .with_quota(1, 1)
            .with_collect_delay(0, 0);
        let colony = Colony::new(2, config, 5).unwrap();
        colony.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !colony.tasks.lock().iter().all(|h| h.is_finished()) {
            assert!(Instant::now() < deadline, "workers never exited");
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(colony.hatch_due().unwrap(), 0);
        assert!(colony.tasks.lock().is_empty());

        let summary = colony.join_workers(Instant::now() + Duration::from_secs(1));
        assert_eq!(summary.joined, 6);
        assert_eq!(summary.outstanding, 0);
    }

    #[test]
    fn test_tracked_tasks_stay_bounded_under_turnover() {
        // Each queen meets its quota in one deposit and lays exactly one
        // successor, so the colony turns over one thread at a time.
        let mut config = quiet_config()
            .with_initial_population(1)
            .with_quota(3, 3)
            .with_collect_delay(0, 1)
            .with_lay_probability(1.0)
            .with_hatch_delay(0, 0);
        config.input_min = 3;
        config.input_max = 3;
        config.queen_probability = 1.0;
        config.scout_probability = 0.0;
        let colony = Colony::new(3, config, 8).unwrap();
        colony.start().unwrap();

        let until = Instant::now() + Duration::from_millis(150);
        while Instant::now() < until {
            colony.hatch_due().unwrap();
            assert!(colony.tasks.lock().len() <= 4);
            thread::sleep(Duration::from_millis(1));
        }
        let snapshot = colony.snapshot();
        assert!(snapshot.hatched > 0);

        colony.terminate();
        let summary = colony.join_workers(Instant::now() + Duration::from_secs(5));
        assert_eq!(summary.outstanding, 0);
        assert_eq!(summary.joined as u64, colony.snapshot().born);
    }
}
