//! Dispatch policies and ranking for the ready queue.
//!
//! The scheduler alternates between two policies:
//!
//! - **Round-robin**: FIFO admission, preemption when the active process
//!   exhausts its quantum.
//! - **Shortest-job**: the ready queue is kept sorted by each colony's live
//!   ranking metric (`population + stored_output`), and the active process
//!   is preempted as soon as a strictly smaller job is waiting.
//!
//! # Score Convention
//! **Lower rank = higher priority**, the same convention as shortest
//! processing time dispatching.
//!
//! # References
//!
//! - Silberschatz et al. (2018), "Operating System Concepts", Ch. 5
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4

mod ordering;

pub use ordering::sort_by_rank;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank returned by a ranked entity. Lower = dispatched first.
pub type RankScore = u64;

/// An entity that can be ordered under the shortest-job policy.
///
/// Implementations may read values that other threads are mutating; a
/// momentarily stale rank only affects fairness, never correctness.
pub trait Ranked {
    /// Current rank (lower = higher priority).
    fn rank(&self) -> RankScore;
}

impl<T: Ranked + ?Sized> Ranked for std::sync::Arc<T> {
    fn rank(&self) -> RankScore {
        (**self).rank()
    }
}

/// Ready-queue ordering and preemption policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    /// FIFO queue with quantum-based preemption.
    #[default]
    RoundRobin,
    /// Queue sorted by ranking metric, rank-based preemption.
    ShortestJob,
}

impl SchedulingPolicy {
    /// Returns the other policy.
    pub fn toggled(self) -> Self {
        match self {
            Self::RoundRobin => Self::ShortestJob,
            Self::ShortestJob => Self::RoundRobin,
        }
    }

    /// Short policy name (e.g., "RR", "SJF").
    pub fn name(self) -> &'static str {
        match self {
            Self::RoundRobin => "RR",
            Self::ShortestJob => "SJF",
        }
    }

    /// Whether insertions must keep the queue sorted by rank.
    pub fn is_ranked(self) -> bool {
        matches!(self, Self::ShortestJob)
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
