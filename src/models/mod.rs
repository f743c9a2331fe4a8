//! Simulation domain models.
//!
//! Plain data types shared by the colony runtime and the scheduler. None
//! of these types synchronize themselves; their owners hold the locks.
//!
//! # Domain Mappings
//!
//! | u-colony | Operating system |
//! |----------|------------------|
//! | Colony | Process |
//! | WorkerRecord | Thread |
//! | ResourceChamber | Address space |
//! | ProcessControlRecord | PCB |

mod chamber;
mod pcb;
mod worker;

pub use chamber::{Cell, CellPos, ResourceChamber};
pub use pcb::{PcbSnapshot, ProcessControlRecord, ProcessId, ProcessState, TransitionError};
pub use worker::{WorkerArena, WorkerId, WorkerRecord, WorkerRole};
