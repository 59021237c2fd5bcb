use rustc_hash::FxHashMap;

use crate::physics::error::PairError;
use crate::physics::handles::PairId;

/// Issues pair ids and maps each live id to the slot currently holding its record.
///
/// Ids come from a monotonic counter and are never handed out twice, so a stale id can never
/// alias a newer pair. Only the mapping entry is reclaimed when a pair dies.
pub struct PairIdAllocator {
    next_id: u64,
    slots: FxHashMap<PairId, usize>,
}

impl PairIdAllocator {
    /// Creates a new allocator with room for `initial_capacity` live ids.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            next_id: 0,
            slots: FxHashMap::with_capacity_and_hasher(initial_capacity, Default::default()),
        }
    }

    /// Takes a fresh id. The id has no slot until [`PairIdAllocator::bind`] is called.
    #[inline(always)]
    pub fn allocate(&mut self) -> PairId {
        let id = PairId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Associates a freshly allocated id with its first slot.
    #[inline(always)]
    pub fn bind(&mut self, id: PairId, slot: usize) {
        let previous = self.slots.insert(id, slot);
        debug_assert!(previous.is_none(), "A pair id can only be bound once.");
    }

    /// Points a live id at the slot its record was moved to.
    #[inline(always)]
    pub fn rebind(&mut self, id: PairId, slot: usize) {
        match self.slots.get_mut(&id) {
            Some(current) => *current = slot,
            None => panic!("Cannot move {id}: it does not refer to a live pair."),
        }
    }

    /// Drops the mapping of a pair that is being destroyed.
    #[inline(always)]
    pub fn release(&mut self, id: PairId) {
        let removed = self.slots.remove(&id);
        debug_assert!(removed.is_some(), "Released ids must be live.");
    }

    /// Gets the slot of a live pair.
    #[inline(always)]
    pub fn lookup(&self, id: PairId) -> Result<usize, PairError> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(PairError::UnknownPairId(id))
    }

    /// Gets whether the id refers to a live pair.
    #[inline(always)]
    pub fn contains(&self, id: PairId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Gets the number of live ids.
    #[inline(always)]
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PairId, usize)> + '_ {
        self.slots.iter().map(|(&id, &slot)| (id, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut ids = PairIdAllocator::new(4);
        let a = ids.allocate();
        ids.bind(a, 0);
        ids.release(a);
        let b = ids.allocate();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn lookup_follows_rebind() {
        let mut ids = PairIdAllocator::new(4);
        let a = ids.allocate();
        ids.bind(a, 3);
        assert_eq!(ids.lookup(a), Ok(3));
        ids.rebind(a, 1);
        assert_eq!(ids.lookup(a), Ok(1));
        assert_eq!(ids.live_count(), 1);
    }

    #[test]
    fn released_id_is_unknown() {
        let mut ids = PairIdAllocator::new(4);
        let a = ids.allocate();
        ids.bind(a, 0);
        ids.release(a);
        assert!(!ids.contains(a));
        assert_eq!(ids.lookup(a), Err(PairError::UnknownPairId(a)));
    }

    #[test]
    #[should_panic(expected = "does not refer to a live pair")]
    fn rebind_of_unknown_id_panics() {
        let mut ids = PairIdAllocator::new(1);
        ids.rebind(PairId(42), 0);
    }
}
