//! Property-based tests for the overlapping pair registry.
//!
//! Random sequences of pair additions and removals are replayed against the registry and a
//! plain model of the live pairs.

mod common;

use std::collections::HashMap;

use common::TestWorld;
use proptest::prelude::*;
use rust_overlapping_pairs::{
    CollisionShapeType, Entity, OverlappingPairs, PairAllocationSizes, PairError, PairId,
    SubShapePairKey,
};

const SHAPE_COUNT: usize = 12;

#[derive(Debug, Clone)]
enum Operation {
    Add(usize, usize),
    /// Removes the live pair at this position of the model, modulo its length.
    Remove(usize),
    Sweep,
    Touch(usize),
}

fn arb_shape_type() -> impl Strategy<Value = CollisionShapeType> {
    prop_oneof![
        Just(CollisionShapeType::Sphere),
        Just(CollisionShapeType::Capsule),
        Just(CollisionShapeType::ConvexPolyhedron),
        Just(CollisionShapeType::ConcaveShape),
    ]
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (0..SHAPE_COUNT, 0..SHAPE_COUNT).prop_map(|(a, b)| Operation::Add(a, b)),
        3 => any::<usize>().prop_map(Operation::Remove),
        1 => Just(Operation::Sweep),
        2 => any::<usize>().prop_map(Operation::Touch),
    ]
}

fn build_world(shape_types: &[CollisionShapeType]) -> (TestWorld, Vec<Entity>) {
    let mut world = TestWorld::new();
    let shapes = shape_types
        .iter()
        .map(|&shape_type| world.add_dynamic_shape(shape_type))
        .collect();
    (world, shapes)
}

fn is_convex_vs_convex(world: &TestWorld, a: Entity, b: Entity) -> bool {
    world.proxy_shapes.0[&a].shape_type.is_convex() && world.proxy_shapes.0[&b].shape_type.is_convex()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Live ids keep resolving to their own shapes, every slot sits in the partition matching
    /// its shapes, and no shape pair is registered twice.
    #[test]
    fn registry_matches_model(
        shape_types in prop::collection::vec(arb_shape_type(), SHAPE_COUNT),
        operations in prop::collection::vec(arb_operation(), 1..120),
    ) {
        let (world, shapes) = build_world(&shape_types);
        let ctx = world.ctx();
        let mut pairs = OverlappingPairs::new(PairAllocationSizes::new(2, 1, None)).unwrap();
        let mut live: Vec<(PairId, Entity, Entity)> = Vec::new();
        let mut by_shapes: HashMap<(Entity, Entity), PairId> = HashMap::new();

        for operation in operations {
            match operation {
                Operation::Add(a, b) => {
                    if a == b {
                        continue;
                    }
                    let (shape1, shape2) = (shapes[a], shapes[b]);
                    let key = (shape1.min(shape2), shape1.max(shape2));
                    let result = pairs.add_pair(&ctx, shape1, shape2);
                    if !shape_types[a].is_convex() && !shape_types[b].is_convex() {
                        prop_assert_eq!(
                            result,
                            Err(PairError::UnsupportedPair { shape1, shape2 })
                        );
                    } else if let Some(&existing) = by_shapes.get(&key) {
                        prop_assert_eq!(result, Ok(existing));
                    } else {
                        let pair_id = result.unwrap();
                        by_shapes.insert(key, pair_id);
                        live.push((pair_id, shape1, shape2));
                    }
                }
                Operation::Remove(position) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (pair_id, shape1, shape2) = live.swap_remove(position % live.len());
                    by_shapes.remove(&(shape1.min(shape2), shape1.max(shape2)));
                    pairs.remove_pair(pair_id).unwrap();
                    prop_assert!(!pairs.contains_pair(pair_id));
                }
                Operation::Sweep => {
                    pairs.clear_obsolete_last_frame_collision_infos();
                }
                Operation::Touch(position) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (pair_id, shape1, shape2) = live[position % live.len()];
                    let slot = pairs.pair_index(pair_id);
                    let info = pairs.add_last_frame_info_if_necessary(slot, shape1.0, shape2.0);
                    info.sat_min_edge1_index = shape1.0;
                    info.sat_min_edge2_index = shape2.0;
                }
            }

            prop_assert_eq!(pairs.nb_pairs(), live.len());
            for &(pair_id, shape1, shape2) in &live {
                prop_assert_eq!(pairs.proxy_shape1(pair_id), shape1);
                prop_assert_eq!(pairs.proxy_shape2(pair_id), shape2);
                let slot = pairs.pair_index(pair_id);
                let in_convex_region = slot < pairs.convex_vs_concave_pairs_start_index();
                prop_assert_eq!(in_convex_region, is_convex_vs_convex(&world, shape1, shape2));
                prop_assert_eq!(pairs.find_pair(shape2, shape1), Some(pair_id));

                // Coherence data never leaks between pairs.
                if let Some(info) = pairs.last_frame_collision_info(
                    pair_id,
                    SubShapePairKey::new(shape1.0, shape2.0),
                ) {
                    prop_assert_eq!(info.sat_min_edge1_index, shape1.0);
                    prop_assert_eq!(info.sat_min_edge2_index, shape2.0);
                }
            }
            let convex_count = live
                .iter()
                .filter(|&&(_, a, b)| is_convex_vs_convex(&world, a, b))
                .count();
            prop_assert_eq!(pairs.nb_convex_vs_convex_pairs(), convex_count);
            prop_assert!(pairs.validate(&world.proxy_shapes).is_ok());
        }
    }

    /// A coherence info outlives any single missed step and is gone after two.
    #[test]
    fn coherence_info_lifetime(touches in prop::collection::vec(any::<bool>(), 1..40)) {
        let (world, shapes) = build_world(&[
            CollisionShapeType::Capsule,
            CollisionShapeType::ConcaveShape,
        ]);
        let mut pairs = OverlappingPairs::new(PairAllocationSizes::default()).unwrap();
        let pair_id = pairs.add_pair(&world.ctx(), shapes[0], shapes[1]).unwrap();
        let slot = pairs.pair_index(pair_id);
        let key = SubShapePairKey::new(5, 9);
        pairs.add_last_frame_info_if_necessary(slot, 9, 5);

        let mut missed_steps = 0;
        for touched in touches {
            if missed_steps >= 2 {
                break;
            }
            if touched {
                pairs.add_last_frame_info_if_necessary(slot, 5, 9);
                missed_steps = 0;
            } else {
                missed_steps += 1;
            }
            pairs.clear_obsolete_last_frame_collision_infos();
            let present = pairs.last_frame_collision_info(pair_id, key).is_some();
            prop_assert_eq!(present, missed_steps < 2);
        }
    }
}
