use crate::physics::collision_detection::pair_store::PairStore;

/// The common set of allocation sizes for an overlapping pair registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairAllocationSizes {
    /// The number of pairs to allocate space for when the registry is created.
    /// The store doubles its capacity whenever it runs out of slots.
    pub pairs: usize,
    /// The number of last frame collision infos to allocate space for in each new pair.
    /// Convex pairs only ever need one; concave pairs grow on demand.
    pub last_frame_infos_per_pair: usize,
    /// Upper bound in bytes for the persistent allocator created by
    /// [`OverlappingPairs::new`](crate::physics::collision_detection::OverlappingPairs::new).
    /// `None` leaves the allocator unbounded.
    pub persistent_memory_limit: Option<usize>,
}

impl PairAllocationSizes {
    /// Number of pairs allocated at the beginning.
    pub const DEFAULT_PAIRS: usize = 10;

    /// Number of bytes charged to the persistent allocator for each pair of capacity.
    /// Use it to size `persistent_memory_limit`.
    pub const BYTES_PER_PAIR: usize = PairStore::PAIR_DATA_SIZE;

    /// Constructs a description of pair allocations.
    pub fn new(
        pairs: usize,
        last_frame_infos_per_pair: usize,
        persistent_memory_limit: Option<usize>,
    ) -> Self {
        Self {
            pairs,
            last_frame_infos_per_pair,
            persistent_memory_limit,
        }
    }
}

impl Default for PairAllocationSizes {
    fn default() -> Self {
        Self {
            pairs: Self::DEFAULT_PAIRS,
            last_frame_infos_per_pair: 1,
            persistent_memory_limit: None,
        }
    }
}
