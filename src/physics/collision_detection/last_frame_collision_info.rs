use glam::Vec3;
use rustc_hash::FxHashMap;

/// Collision state of a sub-shape pair from the previous frame.
///
/// Narrow phase routines read it to warm start instead of searching from scratch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastFrameCollisionInfo {
    /// True if we have information about the previous frame.
    pub is_valid: bool,
    /// True if the info was not refreshed since the last sweep.
    pub is_obsolete: bool,
    /// True if the two shapes were colliding in the previous frame.
    pub was_colliding: bool,
    /// True if GJK was used to check for collision in the previous frame.
    pub was_using_gjk: bool,
    /// True if SAT was used to check for collision in the previous frame.
    pub was_using_sat: bool,

    /// Previous GJK separating axis.
    pub gjk_separating_axis: Vec3,

    pub sat_is_axis_face_polyhedron1: bool,
    pub sat_is_axis_face_polyhedron2: bool,
    pub sat_min_axis_face_index: u32,
    pub sat_min_edge1_index: u32,
    pub sat_min_edge2_index: u32,
}

impl Default for LastFrameCollisionInfo {
    fn default() -> Self {
        Self {
            is_valid: false,
            is_obsolete: false,
            was_colliding: false,
            was_using_gjk: false,
            was_using_sat: false,
            gjk_separating_axis: Vec3::Y,
            sat_is_axis_face_polyhedron1: false,
            sat_is_axis_face_polyhedron2: false,
            sat_min_axis_face_index: 0,
            sat_min_edge1_index: 0,
            sat_min_edge2_index: 0,
        }
    }
}

/// Key of a sub-shape pair inside one overlapping pair.
///
/// Both orders of the same two sub-shape ids produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubShapePairKey(pub u64);

impl SubShapePairKey {
    /// Builds the canonical key for two sub-shape ids. The smaller id occupies the low half.
    #[inline(always)]
    pub fn new(shape_id1: u32, shape_id2: u32) -> Self {
        let (low, high) = if shape_id1 < shape_id2 {
            (shape_id1, shape_id2)
        } else {
            (shape_id2, shape_id1)
        };
        Self(((high as u64) << 32) | low as u64)
    }
}

/// Temporal coherence data of one overlapping pair.
///
/// Two convex shapes share a single entry, but a convex shape against a concave one may produce
/// an entry per overlapping triangle, so the cache grows and shrinks with the contact set.
#[derive(Debug, Clone, Default)]
pub struct LastFrameCollisionInfos {
    infos: FxHashMap<SubShapePairKey, LastFrameCollisionInfo>,
}

impl LastFrameCollisionInfos {
    /// Creates an empty cache with room for `capacity` sub-shape pairs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            infos: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Gets the info of a sub-shape pair without creating it.
    #[inline(always)]
    pub fn get(&self, key: SubShapePairKey) -> Option<&LastFrameCollisionInfo> {
        self.infos.get(&key)
    }

    /// Gets the info of a sub-shape pair mutably without creating it or touching it.
    #[inline(always)]
    pub fn get_mut(&mut self, key: SubShapePairKey) -> Option<&mut LastFrameCollisionInfo> {
        self.infos.get_mut(&key)
    }

    /// Gets the info of a sub-shape pair, creating an invalid one if none exists yet.
    ///
    /// An existing info keeps all of its data; it is only flagged as used this step so the next
    /// sweep keeps it.
    #[inline]
    pub fn get_or_create(&mut self, key: SubShapePairKey) -> &mut LastFrameCollisionInfo {
        let info = self.infos.entry(key).or_default();
        info.is_obsolete = false;
        info
    }

    /// Deletes the infos that were already obsolete and marks every survivor obsolete.
    ///
    /// An info survives one sweep without being touched and disappears at the second.
    /// Returns the number of deleted infos.
    pub fn sweep(&mut self) -> usize {
        let before = self.infos.len();
        self.infos.retain(|_, info| {
            if info.is_obsolete {
                false
            } else {
                info.is_obsolete = true;
                true
            }
        });
        before - self.infos.len()
    }

    /// Deletes every info.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.infos.clear();
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        assert_eq!(SubShapePairKey::new(3, 7), SubShapePairKey::new(7, 3));
        assert_ne!(SubShapePairKey::new(3, 7), SubShapePairKey::new(3, 8));
        assert_ne!(SubShapePairKey::new(0, 1), SubShapePairKey::new(1, 1));
    }

    #[test]
    fn new_info_is_invalid_with_up_axis() {
        let mut infos = LastFrameCollisionInfos::default();
        let info = infos.get_or_create(SubShapePairKey::new(1, 2));
        assert!(!info.is_valid);
        assert!(!info.is_obsolete);
        assert_eq!(info.gjk_separating_axis, Vec3::Y);
    }

    #[test]
    fn get_or_create_keeps_existing_data() {
        let mut infos = LastFrameCollisionInfos::default();
        let key = SubShapePairKey::new(1, 2);
        {
            let info = infos.get_or_create(key);
            info.is_valid = true;
            info.gjk_separating_axis = Vec3::new(0.0, 0.0, -1.0);
        }
        let info = infos.get_or_create(key);
        assert!(info.is_valid);
        assert_eq!(info.gjk_separating_axis, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(infos.len(), 1);
    }

    #[test]
    fn get_mut_does_not_touch() {
        let mut infos = LastFrameCollisionInfos::default();
        let key = SubShapePairKey::new(2, 4);
        infos.get_or_create(key);
        infos.sweep();
        infos.get_mut(key).unwrap().was_colliding = true;
        let info = infos.get(key).unwrap();
        assert!(info.was_colliding);
        assert!(info.is_obsolete);
    }

    #[test]
    fn get_does_not_create() {
        let infos = LastFrameCollisionInfos::with_capacity(4);
        assert!(infos.get(SubShapePairKey::new(1, 2)).is_none());
        assert!(infos.is_empty());
    }

    #[test]
    fn untouched_info_survives_one_sweep_only() {
        let mut infos = LastFrameCollisionInfos::default();
        let key = SubShapePairKey::new(5, 9);
        infos.get_or_create(key);

        assert_eq!(infos.sweep(), 0);
        assert!(infos.get(key).unwrap().is_obsolete);

        assert_eq!(infos.sweep(), 1);
        assert!(infos.get(key).is_none());
    }

    #[test]
    fn touched_info_survives_every_sweep() {
        let mut infos = LastFrameCollisionInfos::default();
        let key = SubShapePairKey::new(5, 9);
        for _ in 0..5 {
            infos.get_or_create(key);
            infos.sweep();
        }
        assert!(infos.get(key).is_some());
    }
}
