use rand::{Rng, rng};

/// A source of uniformly random shard indices.
///
/// This abstraction allows you to plug in a real random source or a scripted
/// one in tests.
///
/// # Example
/// ```
/// use shardseq::ShardSelector;
///
/// struct AlwaysFirst;
/// impl ShardSelector for AlwaysFirst {
///     fn pick(&self, _bound: usize) -> usize {
///         0
///     }
/// }
///
/// assert_eq!(AlwaysFirst.pick(3), 0);
/// ```
pub trait ShardSelector {
    /// Returns an index in `0..bound`. `bound` is never zero.
    ///
    /// Values outside the range are reduced modulo `bound` by the caller.
    fn pick(&self, bound: usize) -> usize;
}

/// A `ShardSelector` backed by the thread-local RNG (`rand::rng()`).
///
/// This type does not store the RNG; it accesses the thread-local generator on
/// each call, so it is `Send + Sync` and free to share across tasks.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl ShardSelector for ThreadRandom {
    fn pick(&self, bound: usize) -> usize {
        rng().random_range(0..bound)
    }
}

/// How shards are chosen across the attempts of a single request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every attempt samples from the full shard set. A shard that already
    /// failed may be picked again, so `N` attempts do not guarantee every
    /// shard is tried.
    Independent,
    /// Attempts sample without replacement: each shard is tried at most once
    /// and `N` attempts cover all `N` shards.
    #[default]
    WithoutReplacement,
}

/// Per-request shard picker.
///
/// Yields exactly `shard_count` indices.
pub(crate) struct AttemptPlan<'a, S: ?Sized> {
    selector: &'a S,
    mode: SelectionMode,
    shard_count: usize,
    remaining: Vec<usize>,
    issued: usize,
}

impl<'a, S: ShardSelector + ?Sized> AttemptPlan<'a, S> {
    pub(crate) fn new(selector: &'a S, mode: SelectionMode, shard_count: usize) -> Self {
        let remaining = match mode {
            SelectionMode::Independent => Vec::new(),
            SelectionMode::WithoutReplacement => (0..shard_count).collect(),
        };
        Self {
            selector,
            mode,
            shard_count,
            remaining,
            issued: 0,
        }
    }
}

impl<S: ShardSelector + ?Sized> AttemptPlan<'_, S> {
    fn pick_below(&self, bound: usize) -> usize {
        self.selector.pick(bound) % bound
    }
}

impl<S: ShardSelector + ?Sized> Iterator for AttemptPlan<'_, S> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.issued == self.shard_count {
            return None;
        }
        self.issued += 1;
        match self.mode {
            SelectionMode::Independent => Some(self.pick_below(self.shard_count)),
            SelectionMode::WithoutReplacement => {
                let slot = self.pick_below(self.remaining.len());
                Some(self.remaining.swap_remove(slot))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Constant(usize);
    impl ShardSelector for Constant {
        fn pick(&self, _bound: usize) -> usize {
            self.0
        }
    }

    #[test]
    fn thread_random_stays_in_bounds() {
        for bound in 1..16 {
            for _ in 0..64 {
                assert!(ThreadRandom.pick(bound) < bound);
            }
        }
    }

    #[test]
    fn independent_plan_may_repeat() {
        let plan: Vec<_> = AttemptPlan::new(&Constant(1), SelectionMode::Independent, 3).collect();
        assert_eq!(plan, [1, 1, 1]);
    }

    #[test]
    fn plan_without_replacement_covers_every_shard() {
        let plan: Vec<_> =
            AttemptPlan::new(&Constant(1), SelectionMode::WithoutReplacement, 4).collect();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.iter().copied().collect::<HashSet<_>>().len(), 4);

        for _ in 0..32 {
            let plan: HashSet<_> =
                AttemptPlan::new(&ThreadRandom, SelectionMode::WithoutReplacement, 5).collect();
            assert_eq!(plan, (0..5).collect());
        }
    }

    #[test]
    fn out_of_range_picks_are_reduced_modulo_bound() {
        let plan: Vec<_> = AttemptPlan::new(&Constant(8), SelectionMode::Independent, 3).collect();
        assert_eq!(plan, [2, 2, 2]);

        let plan: HashSet<_> =
            AttemptPlan::new(&Constant(usize::MAX), SelectionMode::WithoutReplacement, 4).collect();
        assert_eq!(plan, (0..4).collect());
    }

    #[test]
    fn empty_plan_yields_nothing() {
        assert_eq!(AttemptPlan::new(&ThreadRandom, SelectionMode::Independent, 0).count(), 0);
        assert_eq!(
            AttemptPlan::new(&ThreadRandom, SelectionMode::WithoutReplacement, 0).count(),
            0
        );
    }
}
