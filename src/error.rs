//! Hard failures.
//!
//! Only conditions that stop a colony or the simulation from starting are
//! errors. Capacity exhaustion, admission-semaphore timeouts and rejected
//! state transitions are reported through return values and diagnostic
//! events instead.

use std::io;
use thiserror::Error;

use crate::validation::ValidationError;

/// Simulation startup and runtime failures.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration failed validation.
    #[error("invalid configuration: {}", summarize(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// A worker task could not be started.
    #[error("colony {colony}: failed to spawn worker task")]
    WorkerSpawn {
        /// Colony that owns the worker.
        colony: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A scheduler control task could not be started.
    #[error("failed to spawn scheduler task '{task}'")]
    BackgroundSpawn {
        /// Task name.
        task: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The simulation has already shut down.
    #[error("simulation is shut down")]
    ShutDown,
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, SimError>;
