use std::collections::HashMap;
use std::time::Instant;

use crate::physics::handles::PairId;

/// Hooks invoked by the overlapping pair registry around its operations.
///
/// Every method has an empty default body, so implementors only override what they need.
pub trait PairsObserver {
    /// Called after a pair was created in `slot`.
    fn pair_added(&mut self, _pair_id: PairId, _slot: usize) {}

    /// Called after a pair was destroyed.
    fn pair_removed(&mut self, _pair_id: PairId) {}

    /// Called when a stage of the registry starts.
    fn start(&mut self, _stage: &'static str) {}

    /// Called when a stage of the registry ends.
    fn end(&mut self, _stage: &'static str) {}
}

/// Observer that does nothing. Used when no profiling is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PairsObserver for NoopObserver {}

/// Stores profiling information for the registry stages executed since the last clear.
#[derive(Debug, Default)]
pub struct PairsProfiler {
    stages: HashMap<&'static str, f64>,
    start_timestamps: HashMap<&'static str, Instant>,
    added_pairs: usize,
    removed_pairs: usize,
}

impl PairsProfiler {
    /// Creates a new profiler.
    pub fn new(initial_stage_count: usize) -> Self {
        Self {
            stages: HashMap::with_capacity(initial_stage_count),
            start_timestamps: HashMap::with_capacity(initial_stage_count),
            added_pairs: 0,
            removed_pairs: 0,
        }
    }

    /// Gets the accumulated time in seconds spent in the given stage, if it ran.
    pub fn get(&self, stage: &'static str) -> Option<f64> {
        self.stages.get(stage).copied()
    }

    /// Gets the number of pairs created since the last clear.
    #[inline(always)]
    pub fn added_pairs(&self) -> usize {
        self.added_pairs
    }

    /// Gets the number of pairs destroyed since the last clear.
    #[inline(always)]
    pub fn removed_pairs(&self) -> usize {
        self.removed_pairs
    }

    /// Clears all accumulated stage times and counters.
    pub fn clear(&mut self) {
        debug_assert!(
            self.start_timestamps.is_empty(),
            "It's likely that some stage was left unended from the previous frame."
        );
        self.stages.clear();
        self.added_pairs = 0;
        self.removed_pairs = 0;
    }
}

impl PairsObserver for PairsProfiler {
    fn pair_added(&mut self, _pair_id: PairId, _slot: usize) {
        self.added_pairs += 1;
    }

    fn pair_removed(&mut self, _pair_id: PairId) {
        self.removed_pairs += 1;
    }

    fn start(&mut self, stage: &'static str) {
        debug_assert!(
            !self.start_timestamps.contains_key(stage),
            "Cannot start a stage that has already been started."
        );
        self.start_timestamps.insert(stage, Instant::now());
    }

    fn end(&mut self, stage: &'static str) {
        let end_time = Instant::now();
        match self.start_timestamps.remove(stage) {
            Some(start_time) => {
                let elapsed = end_time.duration_since(start_time).as_secs_f64();
                *self.stages.entry(stage).or_insert(0.0) += elapsed;
            }
            None => debug_assert!(
                false,
                "To end a stage, it must currently be active (started and not already stopped)."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_time_accumulates() {
        let mut profiler = PairsProfiler::new(2);
        assert_eq!(profiler.get("add_pair"), None);
        profiler.start("add_pair");
        profiler.end("add_pair");
        profiler.start("add_pair");
        profiler.end("add_pair");
        assert!(profiler.get("add_pair").unwrap() >= 0.0);
        profiler.clear();
        assert_eq!(profiler.get("add_pair"), None);
    }

    #[test]
    fn counts_pair_events() {
        let mut profiler = PairsProfiler::default();
        profiler.pair_added(PairId(0), 0);
        profiler.pair_added(PairId(1), 1);
        profiler.pair_removed(PairId(0));
        assert_eq!(profiler.added_pairs(), 2);
        assert_eq!(profiler.removed_pairs(), 1);
    }
}
