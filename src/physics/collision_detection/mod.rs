//! Overlapping pair bookkeeping between the broad phase and the narrow phase.

pub mod broad_phase_pair_event;
pub mod collision_dispatch;
pub mod last_frame_collision_info;
pub mod narrow_phase_pairs;
pub mod overlapping_pairs;
pub(crate) mod pair_id_allocator;
pub(crate) mod pair_store;

pub use broad_phase_pair_event::{BroadPhasePairEvent, NoCollisionPairs, ProxyShapePair};
pub use collision_dispatch::{CollisionDispatch, DefaultCollisionDispatch, NarrowPhaseAlgorithmType};
pub use last_frame_collision_info::{LastFrameCollisionInfo, LastFrameCollisionInfos, SubShapePairKey};
pub use narrow_phase_pairs::{NarrowPhasePairs, PairView};
pub use overlapping_pairs::{OverlappingPairs, PairContext};
pub use pair_store::PairRecord;
