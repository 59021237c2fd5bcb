use std::ops::Range;

use crate::physics::collision_detection::collision_dispatch::NarrowPhaseAlgorithmType;
use crate::physics::collision_detection::last_frame_collision_info::{
    LastFrameCollisionInfo, LastFrameCollisionInfos, SubShapePairKey,
};
use crate::physics::collision_detection::pair_store::{PairStoreColumns, PairStoreColumnsMut};
use crate::physics::handles::{Entity, PairId};

/// One pair as seen by narrow phase work.
///
/// Identity and classification are copies; only the pair's own coherence data and flags are
/// writable, so views of different slots never alias.
pub struct PairView<'a> {
    pub slot: usize,
    pub pair_id: PairId,
    pub broad_phase_id1: i32,
    pub broad_phase_id2: i32,
    pub proxy_shape1: Entity,
    pub proxy_shape2: Entity,
    pub is_shape1_convex: bool,
    pub narrow_phase_algorithm_type: NarrowPhaseAlgorithmType,
    pub last_frame_collision_infos: &'a mut LastFrameCollisionInfos,
    pub need_to_test_overlap: &'a mut bool,
    pub is_active: &'a mut bool,
}

impl PairView<'_> {
    /// Gets the coherence info of a sub-shape pair, creating it on first use.
    #[inline(always)]
    pub fn add_last_frame_info_if_necessary(
        &mut self,
        shape_id1: u32,
        shape_id2: u32,
    ) -> &mut LastFrameCollisionInfo {
        self.last_frame_collision_infos
            .get_or_create(SubShapePairKey::new(shape_id1, shape_id2))
    }
}

/// Privileged access to the pair store for the collision detection stage.
///
/// Obtained through
/// [`OverlappingPairs::narrow_phase_pairs`](crate::physics::collision_detection::OverlappingPairs::narrow_phase_pairs).
/// While it is borrowed no pair can be added, removed or moved, so the partition ranges read at
/// creation stay valid for its whole lifetime.
pub struct NarrowPhasePairs<'a> {
    columns: PairStoreColumns<'a>,
    columns_mut: PairStoreColumnsMut<'a>,
    concave_pairs_start_index: usize,
    nb_pairs: usize,
}

impl<'a> NarrowPhasePairs<'a> {
    pub(crate) fn new(
        columns: PairStoreColumns<'a>,
        columns_mut: PairStoreColumnsMut<'a>,
        concave_pairs_start_index: usize,
        nb_pairs: usize,
    ) -> Self {
        Self {
            columns,
            columns_mut,
            concave_pairs_start_index,
            nb_pairs,
        }
    }

    #[inline(always)]
    pub fn nb_pairs(&self) -> usize {
        self.nb_pairs
    }

    #[inline(always)]
    pub fn convex_vs_convex_range(&self) -> Range<usize> {
        0..self.concave_pairs_start_index
    }

    #[inline(always)]
    pub fn convex_vs_concave_range(&self) -> Range<usize> {
        self.concave_pairs_start_index..self.nb_pairs
    }

    /// Gets the view of a single slot.
    pub fn pair(&mut self, slot: usize) -> PairView<'_> {
        debug_assert!(slot < self.nb_pairs);
        let columns = self.columns;
        PairView {
            slot,
            pair_id: columns.pair_ids[slot],
            broad_phase_id1: columns.broad_phase_ids1[slot],
            broad_phase_id2: columns.broad_phase_ids2[slot],
            proxy_shape1: columns.proxy_shapes1[slot],
            proxy_shape2: columns.proxy_shapes2[slot],
            is_shape1_convex: columns.is_shape1_convex[slot],
            narrow_phase_algorithm_type: columns.narrow_phase_algorithm_types[slot],
            last_frame_collision_infos: &mut self.columns_mut.last_frame_collision_infos[slot],
            need_to_test_overlap: &mut self.columns_mut.need_to_test_overlap[slot],
            is_active: &mut self.columns_mut.is_active[slot],
        }
    }

    /// Iterates the views of every slot in `range`.
    pub fn pairs_mut<'s>(
        &'s mut self,
        range: Range<usize>,
    ) -> impl Iterator<Item = PairView<'s>> + 's {
        debug_assert!(range.end <= self.nb_pairs);
        let columns: PairStoreColumns<'s> = self.columns;
        let start = range.start;
        let PairStoreColumnsMut {
            last_frame_collision_infos,
            need_to_test_overlap,
            is_active,
        } = &mut self.columns_mut;
        last_frame_collision_infos[range.clone()]
            .iter_mut()
            .zip(need_to_test_overlap[range.clone()].iter_mut())
            .zip(is_active[range].iter_mut())
            .enumerate()
            .map(move |(offset, ((infos, need_to_test_overlap), is_active))| {
                let slot = start + offset;
                PairView {
                    slot,
                    pair_id: columns.pair_ids[slot],
                    broad_phase_id1: columns.broad_phase_ids1[slot],
                    broad_phase_id2: columns.broad_phase_ids2[slot],
                    proxy_shape1: columns.proxy_shapes1[slot],
                    proxy_shape2: columns.proxy_shapes2[slot],
                    is_shape1_convex: columns.is_shape1_convex[slot],
                    narrow_phase_algorithm_type: columns.narrow_phase_algorithm_types[slot],
                    last_frame_collision_infos: infos,
                    need_to_test_overlap,
                    is_active,
                }
            })
    }

    /// Runs `work` on every active pair of `range`. Inactive pairs are skipped.
    pub fn for_each_active<F>(&mut self, range: Range<usize>, mut work: F)
    where
        F: FnMut(&mut PairView<'_>),
    {
        for mut view in self.pairs_mut(range) {
            if *view.is_active {
                work(&mut view);
            }
        }
    }

    /// Runs `work` on every active pair of `range`, spreading the pairs over `thread_count`
    /// scoped threads. Each thread receives a disjoint set of slots.
    ///
    /// A panic inside `work` is propagated to the caller once every thread has stopped.
    pub fn for_each_active_parallel<F>(&mut self, range: Range<usize>, thread_count: usize, work: F)
    where
        F: Fn(&mut PairView<'_>) + Sync,
    {
        let mut views: Vec<PairView<'_>> = self
            .pairs_mut(range)
            .filter(|view| *view.is_active)
            .collect();
        if thread_count <= 1 || views.len() < 2 {
            views.iter_mut().for_each(&work);
            return;
        }

        let chunk_size = views.len().div_ceil(thread_count);
        let work = &work;
        let result = crossbeam_utils::thread::scope(|scope| {
            for chunk in views.chunks_mut(chunk_size) {
                scope.spawn(move |_| chunk.iter_mut().for_each(work));
            }
        });
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }

    /// Sweeps the coherence data of every active pair. See
    /// [`LastFrameCollisionInfos::sweep`]. Returns the number of deleted infos.
    pub fn clear_obsolete_last_frame_collision_infos(&mut self) -> usize {
        let mut deleted = 0;
        let range = 0..self.nb_pairs;
        self.for_each_active(range, |view| deleted += view.last_frame_collision_infos.sweep());
        deleted
    }
}
