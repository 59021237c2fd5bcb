use std::mem::size_of;
use std::ops::Range;

use tracing::{debug, error, trace};

use crate::physics::collision_detection::collision_dispatch::NarrowPhaseAlgorithmType;
use crate::physics::collision_detection::last_frame_collision_info::LastFrameCollisionInfos;
use crate::physics::collision_detection::pair_id_allocator::PairIdAllocator;
use crate::physics::error::PairError;
use crate::physics::handles::{Entity, PairId};
use crate::utilities::memory::allocator::MemoryAllocator;

/// Pair id stored in slots that were reserved but not yet written.
const VACANT: PairId = PairId(u64::MAX);

/// Field values of a pair, as written into a freshly reserved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRecord {
    pub pair_id: PairId,
    pub broad_phase_id1: i32,
    pub broad_phase_id2: i32,
    pub proxy_shape1: Entity,
    pub proxy_shape2: Entity,
    pub is_shape1_convex: bool,
    pub narrow_phase_algorithm_type: NarrowPhaseAlgorithmType,
    pub need_to_test_overlap: bool,
    pub is_active: bool,
}

/// Structure of arrays holding every overlapping pair.
///
/// Slots `[0, concave_pairs_start_index)` hold convex vs convex pairs and slots
/// `[concave_pairs_start_index, nb_pairs)` hold convex vs concave pairs. Records move between
/// slots whenever pairs are added or removed; every move is reported to the [`PairIdAllocator`]
/// before the call returns.
pub struct PairStore {
    nb_pairs: usize,
    concave_pairs_start_index: usize,
    nb_allocated_pairs: usize,
    last_frame_infos_per_pair: usize,

    pair_ids: Vec<PairId>,
    broad_phase_ids1: Vec<i32>,
    broad_phase_ids2: Vec<i32>,
    proxy_shapes1: Vec<Entity>,
    proxy_shapes2: Vec<Entity>,
    /// Temporal coherence data of each pair. Moves with its pair.
    last_frame_collision_infos: Vec<LastFrameCollisionInfos>,
    need_to_test_overlap: Vec<bool>,
    is_active: Vec<bool>,
    narrow_phase_algorithm_types: Vec<NarrowPhaseAlgorithmType>,
    is_shape1_convex: Vec<bool>,
}

impl PairStore {
    /// Size in bytes of a single pair.
    pub const PAIR_DATA_SIZE: usize = size_of::<PairId>()
        + 2 * size_of::<i32>()
        + 2 * size_of::<Entity>()
        + size_of::<LastFrameCollisionInfos>()
        + 2 * size_of::<bool>()
        + size_of::<NarrowPhaseAlgorithmType>()
        + size_of::<bool>();

    /// Creates a store with room for `initial_capacity` pairs, charged to `allocator`.
    pub fn new(
        initial_capacity: usize,
        last_frame_infos_per_pair: usize,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<Self, PairError> {
        let mut store = Self {
            nb_pairs: 0,
            concave_pairs_start_index: 0,
            nb_allocated_pairs: 0,
            last_frame_infos_per_pair,
            pair_ids: Vec::new(),
            broad_phase_ids1: Vec::new(),
            broad_phase_ids2: Vec::new(),
            proxy_shapes1: Vec::new(),
            proxy_shapes2: Vec::new(),
            last_frame_collision_infos: Vec::new(),
            need_to_test_overlap: Vec::new(),
            is_active: Vec::new(),
            narrow_phase_algorithm_types: Vec::new(),
            is_shape1_convex: Vec::new(),
        };
        if initial_capacity > 0 {
            store.allocate(initial_capacity, allocator)?;
        }
        Ok(store)
    }

    /// Gets the number of pairs.
    #[inline(always)]
    pub fn nb_pairs(&self) -> usize {
        self.nb_pairs
    }

    /// Gets the index of the first convex vs concave pair, which is also the number of convex vs
    /// convex pairs.
    #[inline(always)]
    pub fn concave_pairs_start_index(&self) -> usize {
        self.concave_pairs_start_index
    }

    /// Gets the number of pairs the store can hold before growing.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.nb_allocated_pairs
    }

    /// Gets the number of bytes charged to the persistent allocator.
    #[inline(always)]
    pub fn allocated_byte_count(&self) -> usize {
        self.nb_allocated_pairs * Self::PAIR_DATA_SIZE
    }

    #[inline(always)]
    pub fn convex_vs_convex_range(&self) -> Range<usize> {
        0..self.concave_pairs_start_index
    }

    #[inline(always)]
    pub fn convex_vs_concave_range(&self) -> Range<usize> {
        self.concave_pairs_start_index..self.nb_pairs
    }

    /// Grows every field to hold `nb_pairs_to_allocate` pairs. Existing slots and the partition
    /// boundary are untouched. On failure the store is left exactly as it was.
    fn allocate(
        &mut self,
        nb_pairs_to_allocate: usize,
        allocator: &mut dyn MemoryAllocator,
    ) -> Result<(), PairError> {
        debug_assert!(nb_pairs_to_allocate > self.nb_allocated_pairs);
        let additional_pairs = nb_pairs_to_allocate - self.nb_allocated_pairs;
        let requested_bytes = additional_pairs * Self::PAIR_DATA_SIZE;
        let failure = PairError::AllocationFailure {
            requested_bytes,
            capacity: nb_pairs_to_allocate,
        };

        if let Err(out_of_memory) = allocator.allocate(requested_bytes) {
            error!(%out_of_memory, capacity = nb_pairs_to_allocate, "pair store growth refused");
            return Err(failure);
        }

        let additional = nb_pairs_to_allocate - self.nb_pairs;
        let reserved = self
            .pair_ids
            .try_reserve_exact(additional)
            .and_then(|_| self.broad_phase_ids1.try_reserve_exact(additional))
            .and_then(|_| self.broad_phase_ids2.try_reserve_exact(additional))
            .and_then(|_| self.proxy_shapes1.try_reserve_exact(additional))
            .and_then(|_| self.proxy_shapes2.try_reserve_exact(additional))
            .and_then(|_| self.last_frame_collision_infos.try_reserve_exact(additional))
            .and_then(|_| self.need_to_test_overlap.try_reserve_exact(additional))
            .and_then(|_| self.is_active.try_reserve_exact(additional))
            .and_then(|_| self.narrow_phase_algorithm_types.try_reserve_exact(additional))
            .and_then(|_| self.is_shape1_convex.try_reserve_exact(additional));
        if let Err(reserve_error) = reserved {
            allocator.release(requested_bytes);
            error!(%reserve_error, capacity = nb_pairs_to_allocate, "pair store growth failed");
            return Err(failure);
        }

        debug!(
            from = self.nb_allocated_pairs,
            to = nb_pairs_to_allocate,
            "grew pair store"
        );
        self.nb_allocated_pairs = nb_pairs_to_allocate;
        Ok(())
    }

    /// Appends a slot holding no pair at the end of every field.
    fn push_vacant(&mut self) {
        self.pair_ids.push(VACANT);
        self.broad_phase_ids1.push(-1);
        self.broad_phase_ids2.push(-1);
        self.proxy_shapes1.push(Entity(u32::MAX));
        self.proxy_shapes2.push(Entity(u32::MAX));
        self.last_frame_collision_infos
            .push(LastFrameCollisionInfos::default());
        self.need_to_test_overlap.push(false);
        self.is_active.push(false);
        self.narrow_phase_algorithm_types
            .push(NarrowPhaseAlgorithmType::None);
        self.is_shape1_convex.push(false);
    }

    /// Moves the pair at `source` into `destination`, leaving `source` with stale field values
    /// and an empty coherence cache.
    fn move_pair_to_index(&mut self, source: usize, destination: usize, ids: &mut PairIdAllocator) {
        debug_assert!(source != destination);
        let pair_id = self.pair_ids[source];
        trace!(%pair_id, source, destination, "moving pair");

        self.pair_ids[destination] = pair_id;
        self.broad_phase_ids1[destination] = self.broad_phase_ids1[source];
        self.broad_phase_ids2[destination] = self.broad_phase_ids2[source];
        self.proxy_shapes1[destination] = self.proxy_shapes1[source];
        self.proxy_shapes2[destination] = self.proxy_shapes2[source];
        self.last_frame_collision_infos[destination] =
            std::mem::take(&mut self.last_frame_collision_infos[source]);
        self.need_to_test_overlap[destination] = self.need_to_test_overlap[source];
        self.is_active[destination] = self.is_active[source];
        self.narrow_phase_algorithm_types[destination] = self.narrow_phase_algorithm_types[source];
        self.is_shape1_convex[destination] = self.is_shape1_convex[source];
        self.pair_ids[source] = VACANT;

        ids.rebind(pair_id, destination);
    }

    /// Prepares a slot for a new pair, growing the store if it is full.
    ///
    /// A convex vs concave pair takes the slot after the last pair. A convex vs convex pair takes
    /// the first concave slot, whose record is moved to the end first. The returned slot is
    /// vacant until [`PairStore::write_slot`] fills it.
    pub(crate) fn reserve_slot(
        &mut self,
        is_convex_vs_convex: bool,
        allocator: &mut dyn MemoryAllocator,
        ids: &mut PairIdAllocator,
    ) -> Result<usize, PairError> {
        if self.nb_pairs == self.nb_allocated_pairs {
            let target = (self.nb_allocated_pairs * 2).max(1);
            self.allocate(target, allocator)?;
        }

        self.push_vacant();
        let slot = if is_convex_vs_convex {
            if self.concave_pairs_start_index != self.nb_pairs {
                self.move_pair_to_index(self.concave_pairs_start_index, self.nb_pairs, ids);
            }
            let slot = self.concave_pairs_start_index;
            self.concave_pairs_start_index += 1;
            slot
        } else {
            self.nb_pairs
        };
        self.nb_pairs += 1;

        debug_assert!(self.concave_pairs_start_index <= self.nb_pairs);
        Ok(slot)
    }

    /// Fills a reserved slot and binds the pair id to it.
    pub(crate) fn write_slot(&mut self, slot: usize, record: &PairRecord, ids: &mut PairIdAllocator) {
        debug_assert!(
            self.pair_ids[slot] == VACANT,
            "Only reserved slots can be written."
        );
        self.pair_ids[slot] = record.pair_id;
        self.broad_phase_ids1[slot] = record.broad_phase_id1;
        self.broad_phase_ids2[slot] = record.broad_phase_id2;
        self.proxy_shapes1[slot] = record.proxy_shape1;
        self.proxy_shapes2[slot] = record.proxy_shape2;
        self.last_frame_collision_infos[slot] =
            LastFrameCollisionInfos::with_capacity(self.last_frame_infos_per_pair);
        self.need_to_test_overlap[slot] = record.need_to_test_overlap;
        self.is_active[slot] = record.is_active;
        self.narrow_phase_algorithm_types[slot] = record.narrow_phase_algorithm_type;
        self.is_shape1_convex[slot] = record.is_shape1_convex;
        ids.bind(record.pair_id, slot);
    }

    /// Exchanges every field of two slots, coherence data included, and updates both id mappings.
    pub(crate) fn swap(&mut self, slot_a: usize, slot_b: usize, ids: &mut PairIdAllocator) {
        if slot_a == slot_b {
            return;
        }
        trace!(slot_a, slot_b, "swapping pairs");
        self.pair_ids.swap(slot_a, slot_b);
        self.broad_phase_ids1.swap(slot_a, slot_b);
        self.broad_phase_ids2.swap(slot_a, slot_b);
        self.proxy_shapes1.swap(slot_a, slot_b);
        self.proxy_shapes2.swap(slot_a, slot_b);
        self.last_frame_collision_infos.swap(slot_a, slot_b);
        self.need_to_test_overlap.swap(slot_a, slot_b);
        self.is_active.swap(slot_a, slot_b);
        self.narrow_phase_algorithm_types.swap(slot_a, slot_b);
        self.is_shape1_convex.swap(slot_a, slot_b);

        ids.rebind(self.pair_ids[slot_a], slot_a);
        ids.rebind(self.pair_ids[slot_b], slot_b);
    }

    /// Destroys the pair at `slot` and releases its id.
    ///
    /// The hole is filled with the last record of the same partition. Removing a convex vs convex
    /// pair also moves the last convex vs concave pair into the slot vacated at the partition
    /// boundary, so both regions stay contiguous. Returns the id of the destroyed pair.
    pub(crate) fn destroy_slot(&mut self, slot: usize, ids: &mut PairIdAllocator) -> PairId {
        debug_assert!(slot < self.nb_pairs);
        let pair_id = self.pair_ids[slot];
        self.last_frame_collision_infos[slot].clear();

        let last = self.nb_pairs - 1;
        if slot >= self.concave_pairs_start_index {
            self.swap(slot, last, ids);
        } else {
            let last_convex = self.concave_pairs_start_index - 1;
            self.swap(slot, last_convex, ids);
            self.swap(last_convex, last, ids);
            self.concave_pairs_start_index -= 1;
        }

        self.pop();
        self.nb_pairs -= 1;
        ids.release(pair_id);

        debug_assert!(self.concave_pairs_start_index <= self.nb_pairs);
        pair_id
    }

    /// Moves the pair at `slot` to the other partition and returns its new slot.
    ///
    /// The record trades places with the pair sitting at the partition boundary, then the
    /// boundary shifts by one. The pair keeps its id and its coherence data.
    pub(crate) fn move_to_partition(
        &mut self,
        slot: usize,
        is_convex_vs_convex: bool,
        ids: &mut PairIdAllocator,
    ) -> usize {
        debug_assert!(slot < self.nb_pairs);
        let in_convex_region = slot < self.concave_pairs_start_index;
        if in_convex_region == is_convex_vs_convex {
            return slot;
        }
        let new_slot = if is_convex_vs_convex {
            let boundary = self.concave_pairs_start_index;
            self.swap(slot, boundary, ids);
            self.concave_pairs_start_index += 1;
            boundary
        } else {
            let last_convex = self.concave_pairs_start_index - 1;
            self.swap(slot, last_convex, ids);
            self.concave_pairs_start_index -= 1;
            last_convex
        };
        trace!(slot, new_slot, is_convex_vs_convex, "pair changed partition");
        debug_assert!(self.concave_pairs_start_index <= self.nb_pairs);
        new_slot
    }

    fn pop(&mut self) {
        self.pair_ids.pop();
        self.broad_phase_ids1.pop();
        self.broad_phase_ids2.pop();
        self.proxy_shapes1.pop();
        self.proxy_shapes2.pop();
        self.last_frame_collision_infos.pop();
        self.need_to_test_overlap.pop();
        self.is_active.pop();
        self.narrow_phase_algorithm_types.pop();
        self.is_shape1_convex.pop();
    }

    /// Reads back every field of a slot.
    pub(crate) fn record(&self, slot: usize) -> PairRecord {
        PairRecord {
            pair_id: self.pair_ids[slot],
            broad_phase_id1: self.broad_phase_ids1[slot],
            broad_phase_id2: self.broad_phase_ids2[slot],
            proxy_shape1: self.proxy_shapes1[slot],
            proxy_shape2: self.proxy_shapes2[slot],
            is_shape1_convex: self.is_shape1_convex[slot],
            narrow_phase_algorithm_type: self.narrow_phase_algorithm_types[slot],
            need_to_test_overlap: self.need_to_test_overlap[slot],
            is_active: self.is_active[slot],
        }
    }

    #[inline(always)]
    pub fn pair_id(&self, slot: usize) -> PairId {
        self.pair_ids[slot]
    }

    #[inline(always)]
    pub fn proxy_shape1(&self, slot: usize) -> Entity {
        self.proxy_shapes1[slot]
    }

    #[inline(always)]
    pub fn proxy_shape2(&self, slot: usize) -> Entity {
        self.proxy_shapes2[slot]
    }

    #[inline(always)]
    pub fn is_active(&self, slot: usize) -> bool {
        self.is_active[slot]
    }

    #[inline(always)]
    pub fn set_is_active(&mut self, slot: usize, is_active: bool) {
        self.is_active[slot] = is_active;
    }

    #[inline(always)]
    pub fn need_to_test_overlap(&self, slot: usize) -> bool {
        self.need_to_test_overlap[slot]
    }

    #[inline(always)]
    pub fn set_need_to_test_overlap(&mut self, slot: usize, need_to_test_overlap: bool) {
        self.need_to_test_overlap[slot] = need_to_test_overlap;
    }

    #[inline(always)]
    pub fn narrow_phase_algorithm_type(&self, slot: usize) -> NarrowPhaseAlgorithmType {
        self.narrow_phase_algorithm_types[slot]
    }

    #[inline(always)]
    pub fn set_narrow_phase_algorithm_type(
        &mut self,
        slot: usize,
        algorithm_type: NarrowPhaseAlgorithmType,
    ) {
        self.narrow_phase_algorithm_types[slot] = algorithm_type;
    }

    #[inline(always)]
    pub fn set_is_shape1_convex(&mut self, slot: usize, is_shape1_convex: bool) {
        self.is_shape1_convex[slot] = is_shape1_convex;
    }

    #[inline(always)]
    pub fn last_frame_collision_infos(&self, slot: usize) -> &LastFrameCollisionInfos {
        &self.last_frame_collision_infos[slot]
    }

    #[inline(always)]
    pub fn last_frame_collision_infos_mut(&mut self, slot: usize) -> &mut LastFrameCollisionInfos {
        &mut self.last_frame_collision_infos[slot]
    }

    /// Splits the store into the read only fields and the fields a narrow phase worker may write.
    pub(crate) fn split_for_dispatch(&mut self) -> (PairStoreColumns<'_>, PairStoreColumnsMut<'_>) {
        (
            PairStoreColumns {
                pair_ids: &self.pair_ids,
                broad_phase_ids1: &self.broad_phase_ids1,
                broad_phase_ids2: &self.broad_phase_ids2,
                proxy_shapes1: &self.proxy_shapes1,
                proxy_shapes2: &self.proxy_shapes2,
                is_shape1_convex: &self.is_shape1_convex,
                narrow_phase_algorithm_types: &self.narrow_phase_algorithm_types,
            },
            PairStoreColumnsMut {
                last_frame_collision_infos: &mut self.last_frame_collision_infos,
                need_to_test_overlap: &mut self.need_to_test_overlap,
                is_active: &mut self.is_active,
            },
        )
    }
}

/// Read only fields of every slot.
#[derive(Clone, Copy)]
pub(crate) struct PairStoreColumns<'a> {
    pub pair_ids: &'a [PairId],
    pub broad_phase_ids1: &'a [i32],
    pub broad_phase_ids2: &'a [i32],
    pub proxy_shapes1: &'a [Entity],
    pub proxy_shapes2: &'a [Entity],
    pub is_shape1_convex: &'a [bool],
    pub narrow_phase_algorithm_types: &'a [NarrowPhaseAlgorithmType],
}

/// Fields of every slot that narrow phase work may write.
pub(crate) struct PairStoreColumnsMut<'a> {
    pub last_frame_collision_infos: &'a mut [LastFrameCollisionInfos],
    pub need_to_test_overlap: &'a mut [bool],
    pub is_active: &'a mut [bool],
}
