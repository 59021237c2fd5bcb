use std::hash::Hash;

// Newtype Pattern for enhanced type safety
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Entity(pub u32);

/// Externally stable identifier of an overlapping pair.
///
/// Pair ids are never reused and never change for the lifetime of the pair, no matter how
/// often the record moves inside the pair store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PairId(pub u64);

/// Two body entities ordered by id, usable as a set key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BodyPair {
    pub first: Entity,
    pub second: Entity,
}

impl BodyPair {
    /// Creates the canonical pair for two bodies. The smaller id always lands in `first`.
    #[inline(always)]
    pub fn new(body_a: Entity, body_b: Entity) -> Self {
        let pair = if body_a.0 < body_b.0 {
            Self {
                first: body_a,
                second: body_b,
            }
        } else {
            Self {
                first: body_b,
                second: body_a,
            }
        };
        assert!(
            pair.first != pair.second,
            "A body pair must reference two different bodies."
        );
        pair
    }
}

/// Unordered pair of proxy shapes, used to reject duplicate pairs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct ShapePairKey(u64);

impl ShapePairKey {
    #[inline(always)]
    pub fn new(shape_a: Entity, shape_b: Entity) -> Self {
        let (low, high) = if shape_a.0 < shape_b.0 {
            (shape_a.0, shape_b.0)
        } else {
            (shape_b.0, shape_a.0)
        };
        Self(((high as u64) << 32) | low as u64)
    }
}

// Simple implementations for Display for user-friendliness
impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Entity<{}>", self.0)
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PairId<{}>", self.0)
    }
}

impl std::fmt::Display for BodyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<{}, {}>", self.first, self.second)
    }
}
