//! Stable rank ordering.
//!
//! Ranks of live colonies change while a sort is in progress, so every
//! sort samples each rank exactly once and orders by the sampled keys.
//! Comparing live values inside the comparator would give the sort an
//! inconsistent ordering.

use std::collections::VecDeque;

use super::{RankScore, Ranked};

/// Re-sorts a queue in place by ascending rank, preserving queue order on ties.
pub fn sort_by_rank<T: Ranked>(queue: &mut VecDeque<T>) {
    if queue.len() < 2 {
        return;
    }

    let mut keyed: Vec<(RankScore, T)> = queue.drain(..).map(|item| (item.rank(), item)).collect();
    keyed.sort_by_key(|(rank, _)| *rank);
    queue.extend(keyed.into_iter().map(|(_, item)| item));
}
