use rustc_hash::FxHashSet;

use crate::physics::handles::{BodyPair, Entity};

/// Two proxy shapes reported together by the broad phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProxyShapePair {
    pub proxy_shape1: Entity,
    pub proxy_shape2: Entity,
}

impl ProxyShapePair {
    pub fn new(proxy_shape1: Entity, proxy_shape2: Entity) -> Self {
        ProxyShapePair {
            proxy_shape1,
            proxy_shape2,
        }
    }
}

/// Change in the overlap status of two proxy shapes, as found by the broad phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BroadPhasePairEvent {
    /// The bounds of the two shapes started to overlap.
    AddPair(ProxyShapePair),
    /// The bounds of the two shapes stopped overlapping.
    DeletePair(ProxyShapePair),
}

/// Set of body pairs that must never collide with each other.
#[derive(Clone, Debug, Default)]
pub struct NoCollisionPairs {
    pairs: FxHashSet<BodyPair>,
}

impl NoCollisionPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevents the two bodies from colliding. Returns false if they already could not.
    pub fn insert(&mut self, body1: Entity, body2: Entity) -> bool {
        self.pairs.insert(BodyPair::new(body1, body2))
    }

    /// Allows the two bodies to collide again. Returns false if they already could.
    pub fn remove(&mut self, body1: Entity, body2: Entity) -> bool {
        self.pairs.remove(&BodyPair::new(body1, body2))
    }

    #[inline(always)]
    pub fn contains(&self, pair: &BodyPair) -> bool {
        self.pairs.contains(pair)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_ignores_body_order() {
        let mut excluded = NoCollisionPairs::new();
        assert!(excluded.insert(Entity(7), Entity(2)));
        assert!(!excluded.insert(Entity(2), Entity(7)));
        assert!(excluded.contains(&BodyPair::new(Entity(2), Entity(7))));
        assert!(excluded.remove(Entity(2), Entity(7)));
        assert!(excluded.is_empty());
    }
}
