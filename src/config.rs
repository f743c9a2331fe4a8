//! Simulation configuration.
//!
//! All durations are integer milliseconds (`*_ms` fields) so configs
//! serialize cleanly; each config exposes `Duration` accessors for the
//! runtime. Configs are plain data: call
//! [`validate_config`](crate::validation::validate_config) (or let
//! [`Simulation::start`](crate::Simulation::start) do it) before use.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dispatching::SchedulingPolicy;

/// Default ready-queue capacity.
pub const DEFAULT_READY_CAPACITY: usize = 40;
/// Default I/O-wait-queue capacity.
pub const DEFAULT_IO_CAPACITY: usize = 40;

/// Scheduler parameters: capacities, quantum bounds, I/O model, timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of processes in the ready queue.
    pub ready_capacity: usize,
    /// Maximum number of processes waiting on I/O.
    pub io_capacity: usize,
    /// Policy in effect at startup.
    pub initial_policy: SchedulingPolicy,
    /// Quantum in effect at startup (ms).
    pub initial_quantum_ms: u64,
    /// Lower quantum bound (ms, inclusive).
    pub quantum_min_ms: u64,
    /// Upper quantum bound (ms, inclusive).
    pub quantum_max_ms: u64,
    /// Minimum interval between quantum redraws (ms).
    pub quantum_update_interval_ms: u64,
    /// Interval after which the timer flips the policy (ms).
    pub policy_switch_interval_ms: u64,
    /// Timer thread tick (ms).
    pub timer_tick_ms: u64,
    /// Probability that a dispatch on an active process models an I/O episode.
    pub io_probability: f64,
    /// Shortest drawn I/O wait (ms).
    pub io_wait_min_ms: u64,
    /// Longest drawn I/O wait (ms).
    pub io_wait_max_ms: u64,
    /// Delay before retrying an I/O completion that found the ready queue full (ms).
    pub io_retry_backoff_ms: u64,
    /// Periodic watcher wake-up while entries are pending (ms).
    pub watcher_poll_ms: u64,
    /// Bound on the admission-semaphore wait in dispatch (ms).
    pub admission_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ready_capacity: DEFAULT_READY_CAPACITY,
            io_capacity: DEFAULT_IO_CAPACITY,
            initial_policy: SchedulingPolicy::RoundRobin,
            initial_quantum_ms: 10,
            quantum_min_ms: 5,
            quantum_max_ms: 20,
            quantum_update_interval_ms: 1_000,
            policy_switch_interval_ms: 5_000,
            timer_tick_ms: 100,
            io_probability: 0.1,
            io_wait_min_ms: 10,
            io_wait_max_ms: 50,
            io_retry_backoff_ms: 5,
            watcher_poll_ms: 50,
            admission_timeout_ms: 2,
        }
    }
}

impl SchedulerConfig {
    /// Sets the ready-queue capacity.
    pub fn with_ready_capacity(mut self, capacity: usize) -> Self {
        self.ready_capacity = capacity;
        self
    }

    /// Sets the I/O-wait-queue capacity.
    pub fn with_io_capacity(mut self, capacity: usize) -> Self {
        self.io_capacity = capacity;
        self
    }

    /// Sets the startup policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.initial_policy = policy;
        self
    }

    /// Sets the startup quantum and its bounds.
    pub fn with_quantum(mut self, initial_ms: u64, min_ms: u64, max_ms: u64) -> Self {
        self.initial_quantum_ms = initial_ms;
        self.quantum_min_ms = min_ms;
        self.quantum_max_ms = max_ms;
        self
    }

    /// Sets the quantum redraw interval.
    pub fn with_quantum_update_interval(mut self, interval_ms: u64) -> Self {
        self.quantum_update_interval_ms = interval_ms;
        self
    }

    /// Sets the policy flip interval.
    pub fn with_policy_switch_interval(mut self, interval_ms: u64) -> Self {
        self.policy_switch_interval_ms = interval_ms;
        self
    }

    /// Sets the I/O episode probability.
    pub fn with_io_probability(mut self, probability: f64) -> Self {
        self.io_probability = probability;
        self
    }

    /// Sets the I/O wait bounds.
    pub fn with_io_wait(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.io_wait_min_ms = min_ms;
        self.io_wait_max_ms = max_ms;
        self
    }

    /// Startup quantum.
    pub fn initial_quantum(&self) -> Duration {
        Duration::from_millis(self.initial_quantum_ms)
    }

    /// Quantum redraw interval.
    pub fn quantum_update_interval(&self) -> Duration {
        Duration::from_millis(self.quantum_update_interval_ms)
    }

    /// Policy flip interval.
    pub fn policy_switch_interval(&self) -> Duration {
        Duration::from_millis(self.policy_switch_interval_ms)
    }

    /// Timer tick.
    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms)
    }

    /// I/O completion retry backoff.
    pub fn io_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.io_retry_backoff_ms)
    }

    /// Watcher periodic wake-up.
    pub fn watcher_poll(&self) -> Duration {
        Duration::from_millis(self.watcher_poll_ms)
    }

    /// Admission-semaphore wait bound.
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_millis(self.admission_timeout_ms)
    }
}

/// Colony and worker parameters.
///
/// Ranges are inclusive on both ends. Role probabilities apply to hatched
/// workers; whatever is left after queen and scout is a plain worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Workers created with a new colony (the first is a queen).
    pub initial_population: u32,
    /// Side length of the square chamber grid.
    pub chamber_size: usize,
    /// Input units per output unit (remainder discarded).
    pub conversion_ratio: u64,
    /// Smallest input amount per collection.
    pub input_min: u64,
    /// Largest input amount per collection.
    pub input_max: u64,
    /// Shortest simulated collection delay (ms).
    pub collect_delay_min_ms: u64,
    /// Longest simulated collection delay (ms).
    pub collect_delay_max_ms: u64,
    /// Smallest collection quota drawn at birth.
    pub quota_min: u64,
    /// Largest collection quota drawn at birth.
    pub quota_max: u64,
    /// Random probes for an empty output cell before using the overflow cell.
    pub probe_attempts: u32,
    /// Probability that a queen lays one offspring per deposit.
    pub lay_probability: f64,
    /// Shortest delay between laying and hatching (ms).
    pub hatch_delay_min_ms: u64,
    /// Longest delay between laying and hatching (ms).
    pub hatch_delay_max_ms: u64,
    /// Probability that a hatched worker is a queen.
    pub queen_probability: f64,
    /// Probability that a hatched worker is a scout.
    pub scout_probability: f64,
    /// Probability that a live queen departs during an emergence check.
    pub queen_departure_probability: f64,
    /// Probability that a pending offspring is consumed as a growth signal.
    pub direct_growth_probability: f64,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            initial_population: 5,
            chamber_size: 10,
            conversion_ratio: 3,
            input_min: 1,
            input_max: 10,
            collect_delay_min_ms: 5,
            collect_delay_max_ms: 20,
            quota_min: 50,
            quota_max: 150,
            probe_attempts: 8,
            lay_probability: 0.2,
            hatch_delay_min_ms: 20,
            hatch_delay_max_ms: 100,
            queen_probability: 0.05,
            scout_probability: 0.25,
            queen_departure_probability: 0.02,
            direct_growth_probability: 0.01,
        }
    }
}

impl ColonyConfig {
    /// Sets the initial population.
    pub fn with_initial_population(mut self, population: u32) -> Self {
        self.initial_population = population;
        self
    }

    /// Sets the chamber side length.
    pub fn with_chamber_size(mut self, size: usize) -> Self {
        self.chamber_size = size;
        self
    }

    /// Sets the input/output conversion ratio.
    pub fn with_conversion_ratio(mut self, ratio: u64) -> Self {
        self.conversion_ratio = ratio;
        self
    }

    /// Sets the collection delay bounds.
    pub fn with_collect_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.collect_delay_min_ms = min_ms;
        self.collect_delay_max_ms = max_ms;
        self
    }

    /// Sets the quota bounds.
    pub fn with_quota(mut self, min: u64, max: u64) -> Self {
        self.quota_min = min;
        self.quota_max = max;
        self
    }

    /// Sets the per-deposit laying probability.
    pub fn with_lay_probability(mut self, probability: f64) -> Self {
        self.lay_probability = probability;
        self
    }

    /// Sets the hatch delay bounds.
    pub fn with_hatch_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.hatch_delay_min_ms = min_ms;
        self.hatch_delay_max_ms = max_ms;
        self
    }

    /// Sets the growth-signal probabilities.
    pub fn with_growth(mut self, queen_departure: f64, direct: f64) -> Self {
        self.queen_departure_probability = queen_departure;
        self.direct_growth_probability = direct;
        self
    }
}

/// Top-level simulation configuration.
///
/// # Example
/// ```
/// use u_colony::config::{SimulationConfig, SchedulerConfig};
///
/// let config = SimulationConfig::default()
///     .with_seed(7)
///     .with_registry_capacity(4)
///     .with_scheduler(SchedulerConfig::default().with_io_probability(0.0));
/// assert_eq!(config.registry_capacity, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Scheduler parameters.
    pub scheduler: SchedulerConfig,
    /// Colony parameters (shared by every colony).
    pub colony: ColonyConfig,
    /// Maximum number of colonies alive at once.
    pub registry_capacity: usize,
    /// RNG seed. `None` = seeded from entropy.
    pub seed: Option<u64>,
    /// Bounded wait for worker tasks at shutdown (ms).
    pub shutdown_grace_ms: u64,
    /// Pause between cycles in [`Simulation::run_for`](crate::Simulation::run_for) (ms).
    pub cycle_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            colony: ColonyConfig::default(),
            registry_capacity: 8,
            seed: None,
            shutdown_grace_ms: 2_000,
            cycle_interval_ms: 5,
        }
    }
}

impl SimulationConfig {
    /// Sets the scheduler parameters.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Sets the colony parameters.
    pub fn with_colony(mut self, colony: ColonyConfig) -> Self {
        self.colony = colony;
        self
    }

    /// Sets the registry capacity.
    pub fn with_registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity;
        self
    }

    /// Sets a fixed RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace_ms: u64) -> Self {
        self.shutdown_grace_ms = grace_ms;
        self
    }

    /// Shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Pause between cycles.
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }
}
