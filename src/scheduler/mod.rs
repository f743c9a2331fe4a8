//! Process scheduler: queues, dispatch engine, control tasks and KPIs.
//!
//! Each admitted colony becomes a process with a PCB. The engine moves
//! processes between the bounded ready queue, the bounded I/O-wait queue
//! and a single active slot under round-robin or shortest-job policy.
//!
//! # Background tasks
//!
//! A timer task redraws the quantum and flips the policy; an I/O watcher
//! returns processes whose modeled I/O wait has elapsed. Both stop
//! cooperatively; see [`BackgroundTasks`].
//!
//! # KPI
//!
//! [`SchedulerKpi`] summarizes PCB snapshots: waits, iterations, fairness.
//!
//! # References
//!
//! - Silberschatz et al. (2018), "Operating System Concepts", Ch. 5
//! - Arpaci-Dusseau (2018), "Operating Systems: Three Easy Pieces", Ch. 7-9

mod background;
mod engine;
mod kpi;
mod process;
mod queue;

pub use background::BackgroundTasks;
pub use engine::{Census, DispatchOutcome, Scheduler};
pub use kpi::{SchedulerKpi, StateMix};
pub use process::ProcessInfo;
pub use queue::{IoWaitEntry, IoWaitQueue, ReadyQueue};
