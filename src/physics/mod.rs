pub mod collision_detection;
pub mod components;
pub mod error;
pub mod handles;
pub mod pair_allocation_sizes;
pub mod pairs_profiler;
