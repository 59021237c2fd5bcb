//! Error types for the overlapping pair registry.

use thiserror::Error;

use crate::physics::handles::{Entity, PairId};

/// Errors that can occur while maintaining overlapping pairs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairError {
    /// The pair id does not refer to a live pair.
    #[error("unknown pair id: {0}")]
    UnknownPairId(PairId),

    /// Growing the pair store could not obtain memory from the persistent allocator.
    #[error("failed to allocate {requested_bytes} bytes for {capacity} pairs")]
    AllocationFailure {
        /// Number of bytes the growth asked for.
        requested_bytes: usize,
        /// Pair capacity the store tried to reach.
        capacity: usize,
    },

    /// Neither shape of the pair is convex.
    #[error("cannot create a pair between two concave shapes {shape1} and {shape2}")]
    UnsupportedPair {
        /// First proxy shape.
        shape1: Entity,
        /// Second proxy shape.
        shape2: Entity,
    },

    /// A structural invariant of the registry does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
