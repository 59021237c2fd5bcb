//! Registry of overlapping proxy shape pairs for the collision detection stage of a physics
//! engine.
//!
//! The broad phase reports which proxy shapes started or stopped overlapping. The
//! [`OverlappingPairs`] registry keeps one record per overlapping pair, partitioned into convex vs
//! convex and convex vs concave pairs, together with the temporal coherence data the narrow phase
//! reuses from one frame to the next.

pub mod physics;
pub mod utilities;

pub use physics::collision_detection::{
    BroadPhasePairEvent, CollisionDispatch, DefaultCollisionDispatch, LastFrameCollisionInfo,
    NarrowPhaseAlgorithmType, NarrowPhasePairs, NoCollisionPairs, OverlappingPairs, PairContext,
    PairView, ProxyShapePair, SubShapePairKey,
};
pub use physics::components::{BodyComponents, BodyType, CollisionShapeType, ProxyShapeComponents};
pub use physics::error::PairError;
pub use physics::handles::{BodyPair, Entity, PairId};
pub use physics::pair_allocation_sizes::PairAllocationSizes;
pub use physics::pairs_profiler::{NoopObserver, PairsObserver, PairsProfiler};
pub use utilities::memory::{HeapAllocator, MemoryAllocator, OutOfMemory};
