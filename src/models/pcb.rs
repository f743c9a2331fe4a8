//! Process control record (PCB).
//!
//! One PCB per admitted colony. The scheduler owns every PCB and mutates it
//! only while holding its own lock.
//!
//! # State Machine
//!
//! ```text
//!            ┌──────────────── quantum / preempt ───────────────┐
//!            v                                                  │
//!   admit → READY ──────────── dispatch ──────────────────→ RUNNING
//!            ^                                                  │
//!            └── I/O complete ── WAITING ←──── I/O episode ─────┤
//!                                                               v
//!                                                          TERMINATED
//! ```
//!
//! Any non-terminated state may also move to TERMINATED when its colony is
//! destroyed. Nothing leaves TERMINATED.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Process identifier; equal to the owning colony's id.
pub type ProcessId = u32;

/// Scheduling state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// In the ready queue.
    Ready,
    /// Occupying the active slot.
    Running,
    /// In the I/O-wait queue.
    Waiting,
    /// Colony destroyed; final.
    Terminated,
}

impl ProcessState {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (Ready, Running)
                | (Running, Ready)
                | (Running, Waiting)
                | (Waiting, Ready)
                | (Ready, Terminated)
                | (Running, Terminated)
                | (Waiting, Terminated)
        )
    }
}

/// A rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("process {pid}: illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    /// Process that rejected the transition.
    pub pid: ProcessId,
    /// State it was in.
    pub from: ProcessState,
    /// State that was requested.
    pub to: ProcessState,
}

/// Per-process scheduling statistics.
#[derive(Debug, Clone)]
pub struct ProcessControlRecord {
    /// Process id.
    pub pid: ProcessId,
    /// Admission time.
    pub arrival: Instant,
    /// Number of times the process entered RUNNING.
    pub iterations: u64,
    /// Total time spent in READY.
    pub ready_wait: Duration,
    /// Completed READY stays.
    pub ready_episodes: u64,
    /// Total time spent in WAITING.
    pub io_wait: Duration,
    /// Completed WAITING stays.
    pub io_episodes: u64,
    /// Current state.
    pub state: ProcessState,
    /// When the current state was entered.
    pub state_since: Instant,
}

impl ProcessControlRecord {
    /// Creates a READY record with zeroed statistics.
    pub fn new(pid: ProcessId, arrival: Instant) -> Self {
        Self {
            pid,
            arrival,
            iterations: 0,
            ready_wait: Duration::ZERO,
            ready_episodes: 0,
            io_wait: Duration::ZERO,
            io_episodes: 0,
            state: ProcessState::Ready,
            state_since: arrival,
        }
    }

    /// Moves to `to`, charging the time spent in the current state.
    ///
    /// Illegal transitions leave the record untouched.
    pub fn transition(&mut self, to: ProcessState, now: Instant) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                pid: self.pid,
                from: self.state,
                to,
            });
        }

        let spent = now.saturating_duration_since(self.state_since);
        match self.state {
            ProcessState::Ready => {
                self.ready_wait += spent;
                self.ready_episodes += 1;
            }
            ProcessState::Waiting => {
                self.io_wait += spent;
                self.io_episodes += 1;
            }
            ProcessState::Running | ProcessState::Terminated => {}
        }

        if to == ProcessState::Running {
            self.iterations += 1;
        }
        self.state = to;
        self.state_since = now;
        Ok(())
    }

    /// Mean completed READY stay.
    pub fn avg_ready_wait(&self) -> Duration {
        average(self.ready_wait, self.ready_episodes)
    }

    /// Mean completed WAITING stay.
    pub fn avg_io_wait(&self) -> Duration {
        average(self.io_wait, self.io_episodes)
    }

    /// Whether the process has terminated.
    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }

    /// Serializable view, with times relative to `epoch`.
    pub fn snapshot(&self, epoch: Instant) -> PcbSnapshot {
        PcbSnapshot {
            pid: self.pid,
            arrival_ms: millis(self.arrival.saturating_duration_since(epoch)),
            iterations: self.iterations,
            ready_wait_total_ms: millis(self.ready_wait),
            ready_wait_avg_ms: millis(self.avg_ready_wait()),
            io_wait_total_ms: millis(self.io_wait),
            io_wait_avg_ms: millis(self.avg_io_wait()),
            state: self.state,
        }
    }
}

/// PCB fields exposed to the statistics sink.
///
/// All times are milliseconds; `arrival_ms` is relative to scheduler start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSnapshot {
    /// Process id.
    pub pid: ProcessId,
    /// Admission time since scheduler start (ms).
    pub arrival_ms: u64,
    /// RUNNING entries.
    pub iterations: u64,
    /// Cumulative ready wait (ms).
    pub ready_wait_total_ms: u64,
    /// Average ready wait (ms).
    pub ready_wait_avg_ms: u64,
    /// Cumulative I/O wait (ms).
    pub io_wait_total_ms: u64,
    /// Average I/O wait (ms).
    pub io_wait_avg_ms: u64,
    /// Current state.
    pub state: ProcessState,
}

fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
