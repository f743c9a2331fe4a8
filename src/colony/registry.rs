//! Bounded set of live colonies.

use std::sync::Arc;

use super::{Colony, ColonyId};

/// Registry of every colony created during a simulation.
///
/// Capacity bounds the number of *live* (non-terminated) colonies;
/// terminated colonies stay registered until shutdown so their final
/// counters remain visible.
#[derive(Debug)]
pub struct ColonyRegistry {
    capacity: usize,
    colonies: Vec<Arc<Colony>>,
    next_id: ColonyId,
}

impl ColonyRegistry {
    /// Creates an empty registry.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            colonies: Vec::new(),
            next_id: 0,
        }
    }

    /// Maximum number of live colonies.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live colonies.
    pub fn live_count(&self) -> usize {
        self.colonies.iter().filter(|c| !c.is_terminated()).count()
    }

    /// Whether another colony may be admitted.
    pub fn has_capacity(&self) -> bool {
        self.live_count() < self.capacity
    }

    /// Reserves the next colony id.
    pub fn allocate_id(&mut self) -> ColonyId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Adds a colony. Hands it back if the registry is full.
    pub fn register(&mut self, colony: Arc<Colony>) -> Result<(), Arc<Colony>> {
        if !self.has_capacity() {
            return Err(colony);
        }
        self.colonies.push(colony);
        Ok(())
    }

    /// Colony by id.
    pub fn get(&self, id: ColonyId) -> Option<&Arc<Colony>> {
        self.colonies.iter().find(|c| c.id() == id)
    }

    /// Live colonies, in registration order.
    pub fn live(&self) -> impl Iterator<Item = &Arc<Colony>> {
        self.colonies.iter().filter(|c| !c.is_terminated())
    }

    /// Every registered colony, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Colony>> {
        self.colonies.iter()
    }

    /// Number of registered colonies, live or not.
    pub fn len(&self) -> usize {
        self.colonies.len()
    }

    /// Whether nothing was ever registered.
    pub fn is_empty(&self) -> bool {
        self.colonies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColonyConfig;

    fn colony(registry: &mut ColonyRegistry) -> Arc<Colony> {
        let id = registry.allocate_id();
        Colony::new(id, ColonyConfig::default(), u64::from(id)).unwrap()
    }

    #[test]
    fn test_capacity_bound() {
        let mut registry = ColonyRegistry::new(2);
        let a = colony(&mut registry);
        let b = colony(&mut registry);
        let c = colony(&mut registry);

        assert!(registry.register(a).is_ok());
        assert!(registry.register(b).is_ok());
        assert!(!registry.has_capacity());
        let rejected = registry.register(c).unwrap_err();
        assert_eq!(rejected.id(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_terminated_frees_capacity() {
        let mut registry = ColonyRegistry::new(1);
        let a = colony(&mut registry);
        registry.register(Arc::clone(&a)).unwrap();
        assert!(!registry.has_capacity());

        a.terminate();
        assert!(registry.has_capacity());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(0).is_some());
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = ColonyRegistry::new(4);
        assert!(registry.is_empty());
        assert_eq!(registry.allocate_id(), 0);
        assert_eq!(registry.allocate_id(), 1);
        let c = colony(&mut registry);
        assert_eq!(c.id(), 2);
        registry.register(c).unwrap();
        assert_eq!(registry.live().count(), 1);
        assert_eq!(registry.iter().count(), 1);
    }
}
