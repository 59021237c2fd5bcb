use std::ops::Range;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::physics::collision_detection::broad_phase_pair_event::{
    BroadPhasePairEvent, NoCollisionPairs, ProxyShapePair,
};
use crate::physics::collision_detection::collision_dispatch::{
    CollisionDispatch, NarrowPhaseAlgorithmType,
};
use crate::physics::collision_detection::last_frame_collision_info::{
    LastFrameCollisionInfo, SubShapePairKey,
};
use crate::physics::collision_detection::narrow_phase_pairs::NarrowPhasePairs;
use crate::physics::collision_detection::pair_id_allocator::PairIdAllocator;
use crate::physics::collision_detection::pair_store::{PairRecord, PairStore};
use crate::physics::components::{BodyComponents, CollisionShapeType, ProxyShapeComponents};
use crate::physics::error::PairError;
use crate::physics::handles::{BodyPair, Entity, PairId, ShapePairKey};
use crate::physics::pair_allocation_sizes::PairAllocationSizes;
use crate::physics::pairs_profiler::{NoopObserver, PairsObserver};
use crate::utilities::memory::allocator::{HeapAllocator, MemoryAllocator};

/// Components the registry reads while classifying pairs and computing their activity.
#[derive(Clone, Copy)]
pub struct PairContext<'a> {
    pub proxy_shapes: &'a dyn ProxyShapeComponents,
    pub bodies: &'a dyn BodyComponents,
    pub collision_dispatch: &'a dyn CollisionDispatch,
}

/// Pairs of proxy shapes whose bounds overlap in the broad phase.
///
/// A pair is created when the two shapes start to overlap and is destroyed when they stop.
/// Each pair keeps the temporal coherence data of the narrow phase between frames.
///
/// Pairs are referenced from outside through their [`PairId`], which never changes. The slot
/// holding a pair changes whenever other pairs are added or removed.
pub struct OverlappingPairs<O: PairsObserver = NoopObserver> {
    store: PairStore,
    ids: PairIdAllocator,
    /// Live pair of every unordered proxy shape pair.
    shape_pairs: FxHashMap<ShapePairKey, PairId>,
    /// Persistent allocator charged for the pair store.
    persistent_allocator: Box<dyn MemoryAllocator>,
    observer: O,
}

impl OverlappingPairs<NoopObserver> {
    /// Creates a registry backed by a [`HeapAllocator`] bounded by the configured limit.
    pub fn new(sizes: PairAllocationSizes) -> Result<Self, PairError> {
        let allocator: Box<dyn MemoryAllocator> = match sizes.persistent_memory_limit {
            Some(limit) => Box::new(HeapAllocator::with_limit(limit)),
            None => Box::new(HeapAllocator::new()),
        };
        Self::with_allocator(sizes, allocator, NoopObserver)
    }
}

impl<O: PairsObserver> OverlappingPairs<O> {
    /// Creates a registry drawing its storage from `persistent_allocator` and reporting to
    /// `observer`.
    pub fn with_allocator(
        sizes: PairAllocationSizes,
        mut persistent_allocator: Box<dyn MemoryAllocator>,
        observer: O,
    ) -> Result<Self, PairError> {
        let store = PairStore::new(
            sizes.pairs,
            sizes.last_frame_infos_per_pair,
            persistent_allocator.as_mut(),
        )?;
        Ok(Self {
            store,
            ids: PairIdAllocator::new(sizes.pairs),
            shape_pairs: FxHashMap::with_capacity_and_hasher(sizes.pairs, Default::default()),
            persistent_allocator,
            observer,
        })
    }

    /// Adds an overlapping pair and returns its id.
    ///
    /// If the two shapes already form a pair, the existing id is returned and nothing changes.
    /// Pairs between two concave shapes are not supported.
    pub fn add_pair(
        &mut self,
        ctx: &PairContext<'_>,
        proxy_shape1: Entity,
        proxy_shape2: Entity,
    ) -> Result<PairId, PairError> {
        let shape_pair = ShapePairKey::new(proxy_shape1, proxy_shape2);
        if let Some(&existing) = self.shape_pairs.get(&shape_pair) {
            warn!(%existing, %proxy_shape1, %proxy_shape2, "pair already exists");
            return Ok(existing);
        }

        let shape_type1 = ctx.proxy_shapes.shape_type(proxy_shape1);
        let shape_type2 = ctx.proxy_shapes.shape_type(proxy_shape2);
        let is_shape1_convex = shape_type1.is_convex();
        let is_shape2_convex = shape_type2.is_convex();
        if !is_shape1_convex && !is_shape2_convex {
            return Err(PairError::UnsupportedPair {
                shape1: proxy_shape1,
                shape2: proxy_shape2,
            });
        }
        let is_convex_vs_convex = is_shape1_convex && is_shape2_convex;

        // Every component read happens before the store is touched.
        let mut record = PairRecord {
            pair_id: PairId(u64::MAX),
            broad_phase_id1: ctx.proxy_shapes.broad_phase_id(proxy_shape1),
            broad_phase_id2: ctx.proxy_shapes.broad_phase_id(proxy_shape2),
            proxy_shape1,
            proxy_shape2,
            is_shape1_convex,
            narrow_phase_algorithm_type: Self::select_algorithm(ctx, shape_type1, shape_type2),
            need_to_test_overlap: true,
            is_active: Self::compute_is_active(ctx, proxy_shape1, proxy_shape2),
        };

        self.observer.start("add_pair");
        let slot = self
            .store
            .reserve_slot(is_convex_vs_convex, self.persistent_allocator.as_mut(), &mut self.ids);
        let slot = match slot {
            Ok(slot) => slot,
            Err(error) => {
                self.observer.end("add_pair");
                return Err(error);
            }
        };

        let pair_id = self.ids.allocate();
        record.pair_id = pair_id;
        self.store.write_slot(slot, &record, &mut self.ids);
        self.shape_pairs.insert(shape_pair, pair_id);

        debug!(%pair_id, slot, %proxy_shape1, %proxy_shape2, is_convex_vs_convex, "added pair");
        self.observer.pair_added(pair_id, slot);
        self.observer.end("add_pair");
        self.debug_check_counts();
        Ok(pair_id)
    }

    /// Removes a pair and all of its temporal coherence data.
    pub fn remove_pair(&mut self, pair_id: PairId) -> Result<(), PairError> {
        let slot = self.ids.lookup(pair_id)?;
        self.observer.start("remove_pair");

        let shape_pair =
            ShapePairKey::new(self.store.proxy_shape1(slot), self.store.proxy_shape2(slot));
        self.shape_pairs.remove(&shape_pair);
        self.store.destroy_slot(slot, &mut self.ids);

        debug!(%pair_id, slot, "removed pair");
        self.observer.pair_removed(pair_id);
        self.observer.end("remove_pair");
        self.debug_check_counts();
        Ok(())
    }

    /// Applies the broad phase events of a step, in order.
    ///
    /// A new overlap between shapes of the same body, or of two bodies in `no_collision_pairs`,
    /// does not create a pair. The end of an overlap that has no pair is ignored. The first
    /// failure aborts the update.
    pub fn update_overlapping_pairs<I>(
        &mut self,
        ctx: &PairContext<'_>,
        events: I,
        no_collision_pairs: &NoCollisionPairs,
    ) -> Result<(), PairError>
    where
        I: IntoIterator<Item = BroadPhasePairEvent>,
    {
        self.observer.start("update_overlapping_pairs");
        let result = events.into_iter().try_for_each(|event| match event {
            BroadPhasePairEvent::AddPair(pair) => {
                if self.can_collide(ctx, pair, no_collision_pairs) {
                    self.add_pair(ctx, pair.proxy_shape1, pair.proxy_shape2)?;
                }
                Ok(())
            }
            BroadPhasePairEvent::DeletePair(pair) => {
                match self.find_pair(pair.proxy_shape1, pair.proxy_shape2) {
                    Some(pair_id) => self.remove_pair(pair_id),
                    None => Ok(()),
                }
            }
        });
        self.observer.end("update_overlapping_pairs");
        result
    }

    fn can_collide(
        &self,
        ctx: &PairContext<'_>,
        pair: ProxyShapePair,
        no_collision_pairs: &NoCollisionPairs,
    ) -> bool {
        let body1 = ctx.proxy_shapes.body(pair.proxy_shape1);
        let body2 = ctx.proxy_shapes.body(pair.proxy_shape2);
        if body1 == body2 {
            return false;
        }
        let excluded = no_collision_pairs.contains(&Self::compute_bodies_index_pair(body1, body2));
        if excluded {
            trace!(%body1, %body2, "pair vetoed by no collision set");
        }
        !excluded
    }

    fn select_algorithm(
        ctx: &PairContext<'_>,
        shape_type1: CollisionShapeType,
        shape_type2: CollisionShapeType,
    ) -> NarrowPhaseAlgorithmType {
        if shape_type1.is_convex() && shape_type2.is_convex() {
            ctx.collision_dispatch
                .select_narrow_phase_algorithm(shape_type1, shape_type2)
        } else {
            // Concave shapes are tested as a set of triangles.
            let convex_type = if shape_type1.is_convex() {
                shape_type1
            } else {
                shape_type2
            };
            ctx.collision_dispatch
                .select_narrow_phase_algorithm(convex_type, CollisionShapeType::ConvexPolyhedron)
        }
    }

    fn compute_is_active(ctx: &PairContext<'_>, proxy_shape1: Entity, proxy_shape2: Entity) -> bool {
        let body1 = ctx.proxy_shapes.body(proxy_shape1);
        let body2 = ctx.proxy_shapes.body(proxy_shape2);
        ctx.bodies.is_active(body1) || ctx.bodies.is_active(body2)
    }

    /// Recomputes whether a pair is active: at least one of its bodies must be awake and not
    /// static. Inactive pairs stay registered but are skipped by the narrow phase.
    pub fn update_overlapping_pair_is_active(&mut self, ctx: &PairContext<'_>, pair_id: PairId) {
        let slot = self.live_slot(pair_id);
        let is_active = Self::compute_is_active(
            ctx,
            self.store.proxy_shape1(slot),
            self.store.proxy_shape2(slot),
        );
        self.store.set_is_active(slot, is_active);
    }

    /// Selects the narrow phase algorithm of a pair again, after one of its shapes changed type.
    ///
    /// A pair whose shapes crossed between convex and concave moves to the matching partition and
    /// keeps its id and coherence data. If both shapes are now concave the pair is left untouched
    /// and [`PairError::UnsupportedPair`] is returned; the caller is expected to remove it.
    pub fn update_narrow_phase_algorithm(
        &mut self,
        ctx: &PairContext<'_>,
        pair_id: PairId,
    ) -> Result<(), PairError> {
        let slot = self.ids.lookup(pair_id)?;
        let proxy_shape1 = self.store.proxy_shape1(slot);
        let proxy_shape2 = self.store.proxy_shape2(slot);
        let shape_type1 = ctx.proxy_shapes.shape_type(proxy_shape1);
        let shape_type2 = ctx.proxy_shapes.shape_type(proxy_shape2);
        if !shape_type1.is_convex() && !shape_type2.is_convex() {
            return Err(PairError::UnsupportedPair {
                shape1: proxy_shape1,
                shape2: proxy_shape2,
            });
        }
        let algorithm_type = Self::select_algorithm(ctx, shape_type1, shape_type2);

        let is_convex_vs_convex = shape_type1.is_convex() && shape_type2.is_convex();
        let slot = self
            .store
            .move_to_partition(slot, is_convex_vs_convex, &mut self.ids);
        self.store.set_is_shape1_convex(slot, shape_type1.is_convex());
        self.store.set_narrow_phase_algorithm_type(slot, algorithm_type);
        debug!(%pair_id, slot, ?algorithm_type, "reclassified pair");
        self.debug_check_counts();
        Ok(())
    }

    /// Notifies if a given pair is active or not.
    #[inline(always)]
    pub fn set_is_pair_active(&mut self, pair_id: PairId, is_active: bool) {
        let slot = self.live_slot(pair_id);
        self.store.set_is_active(slot, is_active);
    }

    /// Sets if we need to test a given pair for overlap.
    #[inline(always)]
    pub fn set_need_to_test_overlap(&mut self, pair_id: PairId, need_to_test_overlap: bool) {
        let slot = self.live_slot(pair_id);
        self.store.set_need_to_test_overlap(slot, need_to_test_overlap);
    }

    /// Gets the slot of a live pair.
    ///
    /// # Panics
    /// Panics if `pair_id` does not refer to a live pair.
    #[inline(always)]
    pub fn pair_index(&self, pair_id: PairId) -> usize {
        self.live_slot(pair_id)
    }

    /// Gets the slot of a pair, or [`PairError::UnknownPairId`] if it is not live.
    #[inline(always)]
    pub fn try_pair_index(&self, pair_id: PairId) -> Result<usize, PairError> {
        self.ids.lookup(pair_id)
    }

    #[inline(always)]
    pub fn contains_pair(&self, pair_id: PairId) -> bool {
        self.ids.contains(pair_id)
    }

    /// Gets the pair formed by two proxy shapes, in either order.
    #[inline(always)]
    pub fn find_pair(&self, proxy_shape1: Entity, proxy_shape2: Entity) -> Option<PairId> {
        self.shape_pairs
            .get(&ShapePairKey::new(proxy_shape1, proxy_shape2))
            .copied()
    }

    #[inline(always)]
    pub fn proxy_shape1(&self, pair_id: PairId) -> Entity {
        self.store.proxy_shape1(self.live_slot(pair_id))
    }

    #[inline(always)]
    pub fn proxy_shape2(&self, pair_id: PairId) -> Entity {
        self.store.proxy_shape2(self.live_slot(pair_id))
    }

    #[inline(always)]
    pub fn is_pair_active(&self, pair_id: PairId) -> bool {
        self.store.is_active(self.live_slot(pair_id))
    }

    #[inline(always)]
    pub fn need_to_test_overlap(&self, pair_id: PairId) -> bool {
        self.store.need_to_test_overlap(self.live_slot(pair_id))
    }

    #[inline(always)]
    pub fn narrow_phase_algorithm_type(&self, pair_id: PairId) -> NarrowPhaseAlgorithmType {
        self.store.narrow_phase_algorithm_type(self.live_slot(pair_id))
    }

    /// Reads back every field of a live pair.
    pub fn pair_record(&self, pair_id: PairId) -> PairRecord {
        self.store.record(self.live_slot(pair_id))
    }

    #[inline(always)]
    pub fn nb_pairs(&self) -> usize {
        self.store.nb_pairs()
    }

    #[inline(always)]
    pub fn nb_convex_vs_convex_pairs(&self) -> usize {
        self.store.concave_pairs_start_index()
    }

    #[inline(always)]
    pub fn nb_convex_vs_concave_pairs(&self) -> usize {
        self.store.nb_pairs() - self.store.concave_pairs_start_index()
    }

    #[inline(always)]
    pub fn convex_vs_concave_pairs_start_index(&self) -> usize {
        self.store.concave_pairs_start_index()
    }

    #[inline(always)]
    pub fn convex_vs_convex_range(&self) -> Range<usize> {
        self.store.convex_vs_convex_range()
    }

    #[inline(always)]
    pub fn convex_vs_concave_range(&self) -> Range<usize> {
        self.store.convex_vs_concave_range()
    }

    /// Gets the number of pairs the registry can hold before its storage grows.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Gets the temporal coherence info of a sub-shape pair of a live pair, if it exists.
    pub fn last_frame_collision_info(
        &self,
        pair_id: PairId,
        key: SubShapePairKey,
    ) -> Option<&LastFrameCollisionInfo> {
        self.store
            .last_frame_collision_infos(self.live_slot(pair_id))
            .get(key)
    }

    /// Gets the temporal coherence info of a sub-shape pair in `slot`, creating it if it does not
    /// exist yet. The two sub-shape ids may be given in any order.
    pub fn add_last_frame_info_if_necessary(
        &mut self,
        slot: usize,
        shape_id1: u32,
        shape_id2: u32,
    ) -> &mut LastFrameCollisionInfo {
        debug_assert!(slot < self.store.nb_pairs());
        self.store
            .last_frame_collision_infos_mut(slot)
            .get_or_create(SubShapePairKey::new(shape_id1, shape_id2))
    }

    /// Deletes the coherence infos left untouched for two sweeps and marks the rest obsolete.
    ///
    /// Must run once per step, after the narrow phase. Inactive pairs keep their data untouched.
    /// Returns the number of deleted infos.
    pub fn clear_obsolete_last_frame_collision_infos(&mut self) -> usize {
        self.observer.start("clear_obsolete_last_frame_collision_infos");
        let deleted = self.narrow_phase_pairs().clear_obsolete_last_frame_collision_infos();
        trace!(deleted, "swept last frame collision infos");
        self.observer.end("clear_obsolete_last_frame_collision_infos");
        deleted
    }

    /// Gets the privileged view used by the collision detection stage to walk the partitions.
    pub fn narrow_phase_pairs(&mut self) -> NarrowPhasePairs<'_> {
        let concave_pairs_start_index = self.store.concave_pairs_start_index();
        let nb_pairs = self.store.nb_pairs();
        let (columns, columns_mut) = self.store.split_for_dispatch();
        NarrowPhasePairs::new(columns, columns_mut, concave_pairs_start_index, nb_pairs)
    }

    /// Returns the pair of bodies ordered by id, for use as a set key.
    ///
    /// # Panics
    /// Panics if both entities are the same body.
    #[inline(always)]
    pub fn compute_bodies_index_pair(body1: Entity, body2: Entity) -> BodyPair {
        BodyPair::new(body1, body2)
    }

    #[inline(always)]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    #[inline(always)]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Gets the persistent allocator backing the pair store.
    #[inline(always)]
    pub fn persistent_allocator(&self) -> &dyn MemoryAllocator {
        self.persistent_allocator.as_ref()
    }

    #[inline(always)]
    fn live_slot(&self, pair_id: PairId) -> usize {
        match self.ids.lookup(pair_id) {
            Ok(slot) => {
                debug_assert!(slot < self.store.nb_pairs());
                slot
            }
            Err(error) => panic!("{error}"),
        }
    }

    #[inline(always)]
    fn debug_check_counts(&self) {
        debug_assert!(self.store.concave_pairs_start_index() <= self.store.nb_pairs());
        debug_assert_eq!(self.store.nb_pairs(), self.ids.live_count());
        debug_assert_eq!(self.store.nb_pairs(), self.shape_pairs.len());
    }

    /// Checks every structural invariant of the registry and reports the first violation.
    ///
    /// Every live id maps to the slot holding it, every slot sits in the partition matching the
    /// convexity of its shapes, and no two pairs share the same shapes.
    pub fn validate(&self, proxy_shapes: &dyn ProxyShapeComponents) -> Result<(), PairError> {
        let violation = |message: String| Err(PairError::InvariantViolation(message));
        let nb_pairs = self.store.nb_pairs();
        if self.ids.live_count() != nb_pairs {
            return violation(format!(
                "{} live ids for {} pairs",
                self.ids.live_count(),
                nb_pairs
            ));
        }
        if self.shape_pairs.len() != nb_pairs {
            return violation(format!(
                "{} shape pairs for {} pairs",
                self.shape_pairs.len(),
                nb_pairs
            ));
        }
        for (pair_id, slot) in self.ids.iter() {
            if slot >= nb_pairs || self.store.pair_id(slot) != pair_id {
                return violation(format!("{pair_id} maps to slot {slot} which does not hold it"));
            }
        }
        for slot in 0..nb_pairs {
            let proxy_shape1 = self.store.proxy_shape1(slot);
            let proxy_shape2 = self.store.proxy_shape2(slot);
            let is_convex_vs_convex = proxy_shapes.shape_type(proxy_shape1).is_convex()
                && proxy_shapes.shape_type(proxy_shape2).is_convex();
            let in_convex_region = slot < self.store.concave_pairs_start_index();
            if is_convex_vs_convex != in_convex_region {
                return violation(format!("slot {slot} is in the wrong partition"));
            }
            let key = ShapePairKey::new(proxy_shape1, proxy_shape2);
            if self.shape_pairs.get(&key) != Some(&self.store.pair_id(slot)) {
                return violation(format!(
                    "shapes {proxy_shape1} and {proxy_shape2} of slot {slot} are not indexed"
                ));
            }
        }
        Ok(())
    }
}

impl<O: PairsObserver> Drop for OverlappingPairs<O> {
    fn drop(&mut self) {
        let allocated = self.store.allocated_byte_count();
        self.persistent_allocator.release(allocated);
    }
}
