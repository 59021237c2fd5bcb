use crate::physics::components::CollisionShapeType;

/// Narrow phase routine responsible for testing a pair.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NarrowPhaseAlgorithmType {
    /// No routine can handle the shape types of the pair.
    #[default]
    None = 0,
    SphereVsSphere = 1,
    SphereVsCapsule = 2,
    CapsuleVsCapsule = 3,
    SphereVsConvexPolyhedron = 4,
    CapsuleVsConvexPolyhedron = 5,
    ConvexPolyhedronVsConvexPolyhedron = 6,
}

/// Selects which narrow phase routine handles a pair of shape types.
///
/// Selection must be symmetric: swapping the two types yields the same algorithm.
pub trait CollisionDispatch {
    fn select_narrow_phase_algorithm(
        &self,
        type1: CollisionShapeType,
        type2: CollisionShapeType,
    ) -> NarrowPhaseAlgorithmType;
}

const SHAPE_TYPE_COUNT: usize = 4;

/// Table driven dispatch covering every convex shape type pair.
///
/// Pairs involving a concave shape are dispatched by the caller as the convex shape against
/// [`CollisionShapeType::ConvexPolyhedron`], since concave shapes are tested triangle by triangle.
#[derive(Debug, Clone)]
pub struct DefaultCollisionDispatch {
    matrix: [[NarrowPhaseAlgorithmType; SHAPE_TYPE_COUNT]; SHAPE_TYPE_COUNT],
}

impl DefaultCollisionDispatch {
    /// Creates a dispatch filled with the built-in routines.
    pub fn new() -> Self {
        let mut dispatch = Self {
            matrix: [[NarrowPhaseAlgorithmType::None; SHAPE_TYPE_COUNT]; SHAPE_TYPE_COUNT],
        };
        use CollisionShapeType::*;
        use NarrowPhaseAlgorithmType as Algorithm;
        dispatch.register(Sphere, Sphere, Algorithm::SphereVsSphere);
        dispatch.register(Sphere, Capsule, Algorithm::SphereVsCapsule);
        dispatch.register(Capsule, Capsule, Algorithm::CapsuleVsCapsule);
        dispatch.register(Sphere, ConvexPolyhedron, Algorithm::SphereVsConvexPolyhedron);
        dispatch.register(Capsule, ConvexPolyhedron, Algorithm::CapsuleVsConvexPolyhedron);
        dispatch.register(
            ConvexPolyhedron,
            ConvexPolyhedron,
            Algorithm::ConvexPolyhedronVsConvexPolyhedron,
        );
        dispatch
    }

    /// Overrides the routine used for a shape type pair, in both orders.
    pub fn register(
        &mut self,
        type1: CollisionShapeType,
        type2: CollisionShapeType,
        algorithm: NarrowPhaseAlgorithmType,
    ) {
        self.matrix[type1 as usize][type2 as usize] = algorithm;
        self.matrix[type2 as usize][type1 as usize] = algorithm;
    }
}

impl Default for DefaultCollisionDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionDispatch for DefaultCollisionDispatch {
    #[inline(always)]
    fn select_narrow_phase_algorithm(
        &self,
        type1: CollisionShapeType,
        type2: CollisionShapeType,
    ) -> NarrowPhaseAlgorithmType {
        self.matrix[type1 as usize][type2 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CollisionShapeType::*;

    #[test]
    fn selection_is_symmetric() {
        let dispatch = DefaultCollisionDispatch::new();
        assert_eq!(
            dispatch.select_narrow_phase_algorithm(Sphere, Capsule),
            NarrowPhaseAlgorithmType::SphereVsCapsule
        );
        assert_eq!(
            dispatch.select_narrow_phase_algorithm(Capsule, Sphere),
            NarrowPhaseAlgorithmType::SphereVsCapsule
        );
        assert_eq!(
            dispatch.select_narrow_phase_algorithm(ConvexPolyhedron, Capsule),
            NarrowPhaseAlgorithmType::CapsuleVsConvexPolyhedron
        );
    }

    #[test]
    fn concave_pairs_have_no_direct_routine() {
        let dispatch = DefaultCollisionDispatch::new();
        assert_eq!(
            dispatch.select_narrow_phase_algorithm(Sphere, ConcaveShape),
            NarrowPhaseAlgorithmType::None
        );
    }

    #[test]
    fn registered_routine_overrides_default() {
        let mut dispatch = DefaultCollisionDispatch::new();
        dispatch.register(
            Sphere,
            ConvexPolyhedron,
            NarrowPhaseAlgorithmType::ConvexPolyhedronVsConvexPolyhedron,
        );
        assert_eq!(
            dispatch.select_narrow_phase_algorithm(ConvexPolyhedron, Sphere),
            NarrowPhaseAlgorithmType::ConvexPolyhedronVsConvexPolyhedron
        );
    }
}
