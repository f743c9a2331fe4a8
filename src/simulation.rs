//! Simulation root.
//!
//! Owns the scheduler context, the colony registry and the background
//! tasks, and drives the dispatch loop. One cycle ([`Simulation::step`]):
//!
//! 1. per live colony, under its admission semaphore: hatch due offspring,
//!    run the queen-emergence check, and on a growth signal admit a new
//!    colony if the registry has room;
//! 2. retire colonies that went extinct;
//! 3. one scheduler dispatch.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::colony::{Colony, ColonyId, ColonyRegistry, ColonySnapshot};
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::models::PcbSnapshot;
use crate::scheduler::{BackgroundTasks, DispatchOutcome, Scheduler, SchedulerKpi};
use crate::validation::validate_config;

/// Statistics emitted by one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number, from 1.
    pub cycle: u64,
    /// What the dispatch step did.
    pub outcome: DispatchOutcome,
    /// Colonies admitted this cycle.
    pub admitted: Vec<ColonyId>,
    /// Colonies retired as extinct this cycle.
    pub retired: Vec<ColonyId>,
    /// Every PCB after the cycle.
    pub processes: Vec<PcbSnapshot>,
    /// Every registered colony after the cycle.
    pub colonies: Vec<ColonySnapshot>,
}

/// Final state after [`Simulation::shutdown`].
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    /// Cycles run.
    pub cycles: u64,
    /// Worker tasks that exited within the grace period.
    pub workers_joined: usize,
    /// Worker tasks still running when the grace period ended.
    pub workers_outstanding: usize,
    /// Whether the timer and watcher both stopped.
    pub background_stopped: bool,
    /// Final PCBs, all TERMINATED.
    pub processes: Vec<PcbSnapshot>,
    /// Final colony counters.
    pub colonies: Vec<ColonySnapshot>,
    /// Run-level indicators over `processes`.
    pub kpi: SchedulerKpi,
}

/// Cloneable shutdown request, e.g. for an interrupt handler.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Asks the simulation to stop after the current cycle.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Whether shutdown was requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// A running colony simulation.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use u_colony::config::SimulationConfig;
/// use u_colony::Simulation;
///
/// let mut sim = Simulation::start(SimulationConfig::default().with_seed(1)).unwrap();
/// sim.run_for(Duration::from_millis(200)).unwrap();
/// let report = sim.shutdown();
/// println!("{} iterations", report.kpi.total_iterations);
/// ```
pub struct Simulation {
    config: SimulationConfig,
    scheduler: Arc<Scheduler>,
    registry: ColonyRegistry,
    background: Option<BackgroundTasks>,
    shutdown: ShutdownHandle,
    rng: SmallRng,
    cycle: u64,
    finished: bool,
}

impl Simulation {
    /// Validates `config`, creates the scheduler, starts the initial colony
    /// and the background tasks.
    ///
    /// # Errors
    /// - [`SimError::InvalidConfig`] on a bad configuration.
    /// - [`SimError::WorkerSpawn`] / [`SimError::BackgroundSpawn`] if a
    ///   thread cannot be created; anything already started is stopped.
    pub fn start(config: SimulationConfig) -> Result<Self> {
        validate_config(&config).map_err(SimError::InvalidConfig)?;

        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        };
        let scheduler = Arc::new(Scheduler::new(config.scheduler.clone(), rng.random())?);

        let mut sim = Self {
            registry: ColonyRegistry::new(config.registry_capacity),
            background: None,
            shutdown: ShutdownHandle::default(),
            scheduler,
            rng,
            cycle: 0,
            finished: false,
            config,
        };

        sim.spawn_colony()?;
        sim.background = Some(sim.scheduler.start_background()?);
        info!(
            registry_capacity = sim.config.registry_capacity,
            policy = %sim.scheduler.policy(),
            "simulation started"
        );
        Ok(sim)
    }

    /// Runs one cycle.
    ///
    /// # Errors
    /// [`SimError::ShutDown`] once shutdown was requested.
    pub fn step(&mut self) -> Result<CycleReport> {
        if self.shutdown.is_requested() {
            return Err(SimError::ShutDown);
        }
        self.cycle += 1;

        let mut admitted = Vec::new();
        let live: Vec<Arc<Colony>> = self.registry.live().cloned().collect();
        for colony in &live {
            if self.maintain(colony) {
                match self.spawn_colony() {
                    Ok(Some(id)) => admitted.push(id),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "growth colony failed to start"),
                }
            }
        }

        let mut retired = Vec::new();
        for colony in &live {
            if colony.is_extinct() {
                colony.terminate();
                self.scheduler.retire(colony.id());
                info!(colony = colony.id(), "colony extinct");
                retired.push(colony.id());
            }
        }

        let outcome = self.scheduler.dispatch();
        debug!(cycle = self.cycle, ?outcome, "cycle");

        Ok(CycleReport {
            cycle: self.cycle,
            outcome,
            admitted,
            retired,
            processes: self.scheduler.snapshots(),
            colonies: self.registry.iter().map(|c| c.snapshot()).collect(),
        })
    }

    /// Runs cycles for `duration`, pausing `cycle_interval_ms` between them.
    ///
    /// Returns early, without error, when shutdown is requested. Returns the
    /// number of cycles run.
    pub fn run_for(&mut self, duration: Duration) -> Result<u64> {
        let deadline = Instant::now() + duration;
        let interval = self.config.cycle_interval();
        let mut cycles = 0;

        while Instant::now() < deadline && !self.shutdown.is_requested() {
            self.step()?;
            cycles += 1;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Ok(cycles)
    }

    /// Handle that can request shutdown from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// The scheduler context.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// The colony registry.
    pub fn registry(&self) -> &ColonyRegistry {
        &self.registry
    }

    /// Cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Stops everything and collects final statistics.
    ///
    /// Refuses new admissions, raises every colony's termination flag,
    /// stops the timer and watcher, then waits up to `shutdown_grace_ms`
    /// for worker tasks to exit on their own.
    pub fn shutdown(mut self) -> ShutdownReport {
        self.shutdown.request();
        self.finished = true;
        let grace = self.config.shutdown_grace();
        let deadline = Instant::now() + grace;

        self.scheduler.stop();
        for colony in self.registry.iter() {
            colony.terminate();
        }

        let background_stopped = match self.background.take() {
            Some(mut tasks) => tasks.shutdown(grace),
            None => true,
        };

        let mut workers_joined = 0;
        let mut workers_outstanding = 0;
        for colony in self.registry.iter() {
            let summary = colony.join_workers(deadline);
            workers_joined += summary.joined;
            workers_outstanding += summary.outstanding;
        }
        if workers_outstanding > 0 {
            warn!(workers_outstanding, "workers still running after grace period");
        }

        let processes = self.scheduler.terminate_all();
        let kpi = SchedulerKpi::calculate(&processes);
        info!(
            cycles = self.cycle,
            workers_joined,
            workers_outstanding,
            "simulation shut down"
        );

        ShutdownReport {
            cycles: self.cycle,
            workers_joined,
            workers_outstanding,
            background_stopped,
            processes,
            colonies: self.registry.iter().map(|c| c.snapshot()).collect(),
            kpi,
        }
    }

    /// Hatching and queen check for one colony, under its admission
    /// semaphore. Returns whether a growth signal was consumed.
    fn maintain(&self, colony: &Arc<Colony>) -> bool {
        let Some(info) = self.scheduler.process(colony.id()) else {
            return false;
        };
        let Some(_permit) = info.try_enter(self.config.scheduler.admission_timeout()) else {
            return false;
        };

        if let Err(e) = colony.hatch_due() {
            warn!(colony = colony.id(), error = %e, "hatching failed");
        }
        colony.check_queen_emergence();
        colony.take_growth_signal()
    }

    /// Creates, starts and admits a colony if the registry has room.
    fn spawn_colony(&mut self) -> Result<Option<ColonyId>> {
        if !self.registry.has_capacity() {
            debug!("growth signal ignored: registry full");
            return Ok(None);
        }

        let id = self.registry.allocate_id();
        let colony = Colony::new(id, self.config.colony.clone(), self.rng.random())?;
        if let Err(e) = colony.start() {
            colony.terminate();
            return Err(e);
        }
        if self.registry.register(Arc::clone(&colony)).is_err() {
            colony.terminate();
            return Ok(None);
        }

        if self.scheduler.admit(Arc::clone(&colony)).is_none() {
            // Not schedulable; stop it rather than leave an orphan running.
            colony.terminate();
            return Ok(None);
        }
        info!(colony = id, live = self.registry.live_count(), "colony admitted");
        Ok(Some(id))
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if !self.finished {
            self.scheduler.stop();
            for colony in self.registry.iter() {
                colony.terminate();
            }
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("cycle", &self.cycle)
            .field("colonies", &self.registry.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColonyConfig, SchedulerConfig};
    use crate::models::ProcessState;

    fn base() -> SimulationConfig {
        SimulationConfig::default()
            .with_seed(11)
            .with_scheduler(SchedulerConfig::default().with_io_probability(0.0))
            .with_shutdown_grace(2_000)
    }

    #[test]
    fn test_start_admits_initial_colony() {
        let sim = Simulation::start(base()).unwrap();
        assert_eq!(sim.registry().len(), 1);
        assert_eq!(sim.scheduler().ready_pids(), vec![0]);
        assert_eq!(sim.scheduler().snapshot(0).unwrap().state, ProcessState::Ready);

        let report = sim.shutdown();
        assert!(report.background_stopped);
        assert_eq!(report.workers_outstanding, 0);
        assert!(report
            .processes
            .iter()
            .all(|p| p.state == ProcessState::Terminated));
    }

    #[test]
    fn test_growth_signal_admits_new_colony() {
        let colony = ColonyConfig::default().with_growth(1.0, 0.0);
        let config = base().with_colony(colony).with_registry_capacity(2);
        let mut sim = Simulation::start(config).unwrap();

        let report = sim.step().unwrap();
        assert_eq!(report.admitted, vec![1]);
        assert_eq!(sim.registry().live_count(), 2);
        assert_eq!(sim.scheduler().snapshot(1).unwrap().state, ProcessState::Ready);
        assert_eq!(report.colonies[0].queen_departures, 1);

        // registry full: the next signal is dropped
        let report = sim.step().unwrap();
        assert!(report.admitted.is_empty());
        assert_eq!(sim.registry().len(), 2);

        sim.shutdown();
    }

    #[test]
    fn test_invalid_config_fails_start() {
        let config = base().with_registry_capacity(0);
        assert!(matches!(
            Simulation::start(config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_and_shutdown_is_consistent() {
        let config = base()
            .with_scheduler(
                SchedulerConfig::default()
                    .with_io_probability(0.2)
                    .with_io_wait(1, 5),
            )
            .with_colony(
                ColonyConfig::default()
                    .with_collect_delay(0, 2)
                    .with_quota(5, 20)
                    .with_hatch_delay(0, 5),
            );
        let mut sim = Simulation::start(config).unwrap();
        let cycles = sim.run_for(Duration::from_millis(150)).unwrap();
        assert!(cycles > 0);

        let census = sim.scheduler().census();
        assert!(census.is_balanced());
        assert!(sim.scheduler().membership_consistent());
        assert!(census.ready <= 40 && census.io_wait <= 40);

        let report = sim.shutdown();
        assert_eq!(report.cycles, cycles);
        assert_eq!(report.workers_outstanding, 0);
        assert!(report.kpi.total_iterations > 0);
        assert!(report.colonies.iter().all(|c| c.terminated));
    }

    #[test]
    fn test_shutdown_handle_stops_run() {
        let mut sim = Simulation::start(base()).unwrap();
        let handle = sim.shutdown_handle();
        handle.request();

        assert_eq!(sim.run_for(Duration::from_secs(5)).unwrap(), 0);
        assert!(matches!(sim.step(), Err(SimError::ShutDown)));
        sim.shutdown();
    }

    #[test]
    fn test_extinct_colony_is_retired() {
        let colony = ColonyConfig::default()
            .with_initial_population(1)
            .with_collect_delay(0, 1)
            .with_quota(1, 1)
            .with_lay_probability(0.0)
            .with_growth(0.0, 0.0);
        let mut sim = Simulation::start(base().with_colony(colony)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut retired = false;
        while !retired {
            assert!(Instant::now() < deadline, "colony never went extinct");
            retired = sim.step().unwrap().retired.contains(&0);
            thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(sim.scheduler().snapshot(0).unwrap().state, ProcessState::Terminated);
        assert_eq!(sim.scheduler().census().live, 0);
        assert_eq!(sim.registry().live_count(), 0);
        sim.shutdown();
    }
}
