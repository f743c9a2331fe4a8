//! Worker model.
//!
//! Workers live in an index-stable arena owned by their colony. A worker's
//! identity is its [`WorkerId`] (arena slot), never an address, so the arena
//! can grow while worker tasks are running.

use serde::{Deserialize, Serialize};

/// Stable index of a worker inside its colony's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

/// Worker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerRole {
    /// Lays offspring; may depart to found a new colony.
    Queen,
    /// Collects input and deposits output.
    Worker,
    /// Collects input like a worker.
    Scout,
}

/// A single worker's bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    /// Arena slot.
    pub id: WorkerId,
    /// Role assigned at birth.
    pub role: WorkerRole,
    /// Input collected so far.
    pub collected: u64,
    /// Collection quota drawn at birth; the worker dies when it is reached.
    pub quota: u64,
    /// Whether the worker is still alive.
    pub alive: bool,
}

impl WorkerRecord {
    /// Creates a live worker with nothing collected.
    pub fn new(id: WorkerId, role: WorkerRole, quota: u64) -> Self {
        Self {
            id,
            role,
            collected: 0,
            quota,
            alive: true,
        }
    }

    /// Adds collected input. Returns `true` if the quota is now met.
    pub fn collect(&mut self, amount: u64) -> bool {
        self.collected = self.collected.saturating_add(amount);
        self.quota_met()
    }

    /// Whether the collection quota has been reached.
    pub fn quota_met(&self) -> bool {
        self.collected >= self.quota
    }

    /// Whether this is a live queen.
    pub fn is_live_queen(&self) -> bool {
        self.alive && self.role == WorkerRole::Queen
    }
}

/// Append-only arena of workers.
///
/// Slots are never removed or reordered; dead workers keep their slot.
#[derive(Debug, Clone, Default)]
pub struct WorkerArena {
    slots: Vec<WorkerRecord>,
}

impl WorkerArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new live worker and returns its stable id.
    pub fn spawn(&mut self, role: WorkerRole, quota: u64) -> WorkerId {
        let id = WorkerId(self.slots.len());
        self.slots.push(WorkerRecord::new(id, role, quota));
        id
    }

    /// Worker by id.
    pub fn get(&self, id: WorkerId) -> Option<&WorkerRecord> {
        self.slots.get(id.0)
    }

    /// Mutable worker by id.
    pub fn get_mut(&mut self, id: WorkerId) -> Option<&mut WorkerRecord> {
        self.slots.get_mut(id.0)
    }

    /// First live queen, if any.
    pub fn live_queen(&self) -> Option<WorkerId> {
        self.slots.iter().find(|w| w.is_live_queen()).map(|w| w.id)
    }

    /// Number of live workers.
    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|w| w.alive).count()
    }

    /// Total slots ever allocated.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no worker was ever allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over all workers, dead or alive.
    pub fn iter(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.slots.iter()
    }
}
