//! Scheduling quality metrics (KPIs).
//!
//! Aggregates per-process statistics into run-level indicators.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Avg Ready Wait | Mean over processes of their mean READY wait |
//! | Max Ready Wait | Largest per-process mean READY wait |
//! | Avg I/O Wait | Mean over processes of their mean WAITING time |
//! | Total Iterations | Sum of dispatch counts |
//! | Fairness | Min iterations / max iterations among processes |
//!
//! # Reference
//! Silberschatz et al. (2018), "Operating System Concepts", Ch. 5.2: Scheduling Criteria

use serde::Serialize;

use crate::models::{PcbSnapshot, ProcessState};

/// Run-level scheduling indicators.
///
/// All time values are in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerKpi {
    /// Number of processes measured.
    pub processes: usize,
    /// Mean of per-process average ready waits (ms).
    pub avg_ready_wait_ms: f64,
    /// Largest per-process average ready wait (ms).
    pub max_ready_wait_ms: u64,
    /// Mean of per-process average I/O waits (ms).
    pub avg_io_wait_ms: f64,
    /// Sum of dispatch counts.
    pub total_iterations: u64,
    /// Min / max iterations (1.0 when all equal or nothing ran).
    pub fairness: f64,
    /// Processes per state: ready, running, waiting, terminated.
    pub state_mix: StateMix,
}

/// Count of processes per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateMix {
    /// READY.
    pub ready: usize,
    /// RUNNING.
    pub running: usize,
    /// WAITING.
    pub waiting: usize,
    /// TERMINATED.
    pub terminated: usize,
}

impl SchedulerKpi {
    /// Computes KPIs from process snapshots.
    pub fn calculate(snapshots: &[PcbSnapshot]) -> Self {
        if snapshots.is_empty() {
            return Self {
                fairness: 1.0,
                ..Self::default()
            };
        }

        let n = snapshots.len() as f64;
        let mut state_mix = StateMix::default();
        let mut ready_sum = 0.0;
        let mut io_sum = 0.0;
        let mut max_ready_wait = 0;
        let mut total_iterations = 0;
        let mut min_iter = u64::MAX;
        let mut max_iter = 0;

        for s in snapshots {
            ready_sum += s.ready_wait_avg_ms as f64;
            io_sum += s.io_wait_avg_ms as f64;
            max_ready_wait = max_ready_wait.max(s.ready_wait_avg_ms);
            total_iterations += s.iterations;
            min_iter = min_iter.min(s.iterations);
            max_iter = max_iter.max(s.iterations);

            match s.state {
                ProcessState::Ready => state_mix.ready += 1,
                ProcessState::Running => state_mix.running += 1,
                ProcessState::Waiting => state_mix.waiting += 1,
                ProcessState::Terminated => state_mix.terminated += 1,
            }
        }

        let fairness = if max_iter == 0 {
            1.0
        } else {
            min_iter as f64 / max_iter as f64
        };

        Self {
            processes: snapshots.len(),
            avg_ready_wait_ms: ready_sum / n,
            max_ready_wait_ms: max_ready_wait,
            avg_io_wait_ms: io_sum / n,
            total_iterations,
            fairness,
            state_mix,
        }
    }
}
