//! Worker task loop.

use rand::rngs::SmallRng;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::trace;

use super::{Colony, DepositOutcome};
use crate::models::WorkerId;

/// Body of one worker thread.
///
/// Collects a random input amount, sleeps for the simulated collection
/// delay, then deposits. Checks the colony's termination flag before and
/// after every delay and exits cooperatively; the chamber lock is only held
/// inside [`Colony::deposit`], never across a sleep.
pub(super) fn run(colony: Arc<Colony>, worker: WorkerId, mut rng: SmallRng) {
    let config = colony.config().clone();
    trace!(colony = colony.id(), worker = worker.0, "worker task started");

    loop {
        if colony.is_terminated() {
            colony.stop_worker(worker);
            break;
        }

        let amount = rng.random_range(config.input_min..=config.input_max);
        let delay = rng.random_range(config.collect_delay_min_ms..=config.collect_delay_max_ms);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }

        if colony.is_terminated() {
            colony.stop_worker(worker);
            break;
        }

        match colony.deposit(worker, amount) {
            DepositOutcome::Continue => {}
            DepositOutcome::QuotaMet | DepositOutcome::Gone => break,
        }
    }

    trace!(colony = colony.id(), worker = worker.0, "worker task exited");
}
