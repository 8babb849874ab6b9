//! Shard layout: where each counter lives and which numeric range it owns.

use crate::error::{Error, Result};

/// Distance between consecutive shard offsets in the default layout.
pub const OFFSET_STRIDE: u64 = 1_000_000;

/// Largest counter value the default layout allows before a shard is
/// exhausted.
///
/// A counter at `max_sequence` still yields `offset + max_sequence + 1`, which
/// stays below the next shard's first ID as long as offsets are spaced further
/// apart than `max_sequence`.
pub const DEFAULT_MAX_SEQUENCE: u64 = OFFSET_STRIDE - 1;

/// Default parent node shared by every counter.
pub const DEFAULT_BASE_PATH: &str = "/id-counter";

/// One independent counter stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub counter_path: String,
    pub offset: u64,
}

impl Shard {
    /// Smallest ID this shard can ever return.
    pub const fn first_id(&self) -> u64 {
        self.offset.saturating_add(1)
    }
}

/// The fixed set of shards, defined at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    base_path: String,
    shards: Vec<Shard>,
    max_sequence: u64,
}

impl ShardLayout {
    /// Builds the reference layout: `shard_count` counters under `base_path`,
    /// named `<base_path>/shard-<i>`, with offsets `(i + 1) * 1_000_000`.
    pub fn new(base_path: impl Into<String>, shard_count: usize) -> Self {
        let base_path = base_path.into();
        let shards = (0..shard_count)
            .map(|index| Shard {
                index,
                counter_path: format!("{}/shard-{index}", base_path.trim_end_matches('/')),
                offset: (index as u64 + 1).saturating_mul(OFFSET_STRIDE),
            })
            .collect();
        Self {
            base_path,
            shards,
            max_sequence: DEFAULT_MAX_SEQUENCE,
        }
    }

    /// Builds a layout from explicit counter paths and offsets, paired by
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if the two lists differ in length or
    /// the result fails [`ShardLayout::validate`].
    pub fn from_parts(
        base_path: impl Into<String>,
        counter_paths: Vec<String>,
        offsets: Vec<u64>,
        max_sequence: u64,
    ) -> Result<Self> {
        if counter_paths.len() != offsets.len() {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "{} counter paths but {} offsets",
                    counter_paths.len(),
                    offsets.len()
                ),
            });
        }
        let shards = counter_paths
            .into_iter()
            .zip(offsets)
            .enumerate()
            .map(|(index, (counter_path, offset))| Shard {
                index,
                counter_path,
                offset,
            })
            .collect();
        let layout = Self {
            base_path: base_path.into(),
            shards,
            max_sequence,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Replaces the per-shard counter ceiling.
    #[must_use]
    pub fn with_max_sequence(mut self, max_sequence: u64) -> Self {
        self.max_sequence = max_sequence;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn shard(&self, index: usize) -> Option<&Shard> {
        self.shards.get(index)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    /// Checks that no two shards can ever hand out the same ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] when:
    /// - there are no shards, or a path is empty or relative
    /// - two shards share a counter path
    /// - two offsets are not spaced strictly further apart than
    ///   `max_sequence`
    /// - a shard's largest ID would not fit in a `u64`
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidLayout { reason });

        if self.shards.is_empty() {
            return invalid("layout has no shards".to_owned());
        }
        if !self.base_path.starts_with('/') {
            return invalid(format!("base path {:?} is not absolute", self.base_path));
        }

        let mut paths: Vec<&str> = self.shards.iter().map(|s| s.counter_path.as_str()).collect();
        if let Some(path) = paths.iter().find(|p| !p.starts_with('/') || p.len() < 2) {
            return invalid(format!("counter path {path:?} is not absolute"));
        }
        paths.sort_unstable();
        if let Some(pair) = paths.windows(2).find(|w| w[0] == w[1]) {
            return invalid(format!("counter path {:?} is used twice", pair[0]));
        }

        // Largest ID a shard returns is offset + max_sequence + 1.
        let span = self.max_sequence.checked_add(1);
        for shard in &self.shards {
            if span.and_then(|s| shard.offset.checked_add(s)).is_none() {
                return invalid(format!(
                    "shard {} offset {} overflows u64 with max sequence {}",
                    shard.index, shard.offset, self.max_sequence
                ));
            }
        }

        let mut offsets: Vec<u64> = self.shards.iter().map(|s| s.offset).collect();
        offsets.sort_unstable();
        for pair in offsets.windows(2) {
            if pair[1] - pair[0] <= self.max_sequence {
                return invalid(format!(
                    "offsets {} and {} are not spaced further apart than max sequence {}",
                    pair[0], pair[1], self.max_sequence
                ));
            }
        }

        Ok(())
    }
}
