//! Colony process-scheduler simulation.
//!
//! Each colony is a population of concurrently running worker threads that
//! collect input, deposit converted output into a shared resource chamber,
//! and grow by hatching offspring laid by a queen. Colonies are scheduled as
//! processes by a preemptive scheduler that alternates between round-robin
//! and shortest-job policies, with a bounded ready queue, a bounded I/O-wait
//! queue and a per-process control block.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `ProcessControlRecord`, `ResourceChamber`,
//!   `WorkerArena`
//! - **`colony`**: `Colony` lifecycle, worker tasks, `ColonyRegistry`
//! - **`dispatching`**: `SchedulingPolicy` and the rank ordering used by
//!   shortest-job
//! - **`scheduler`**: queues, dispatch engine, timer/I/O tasks, KPIs
//! - **`simulation`**: the root that wires everything and runs cycles
//! - **`config`** / **`validation`** / **`error`**: parameters, their
//!   checks, and hard failures
//!
//! # Concurrency
//!
//! Native threads: one per live worker, a timer, an I/O watcher, and the
//! caller's dispatch loop. Shutdown is cooperative with a bounded grace
//! period; no thread is ever cancelled while holding a lock.
//!
//! # References
//!
//! - Silberschatz et al. (2018), "Operating System Concepts", Ch. 3-5
//! - Arpaci-Dusseau (2018), "Operating Systems: Three Easy Pieces"

pub mod colony;
pub mod config;
pub mod dispatching;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod simulation;
pub mod validation;

pub use error::{Result, SimError};
pub use simulation::{CycleReport, ShutdownHandle, ShutdownReport, Simulation};
