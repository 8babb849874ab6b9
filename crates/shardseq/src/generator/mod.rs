//! Shard selection and failover on top of the [`SequenceAllocator`].


#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    allocator::{ParsePolicy, SequenceAllocator},
    error::{AttemptFailure, Error, Result},
    layout::ShardLayout,
    pool::ConnectionPool,
    select::{AttemptPlan, SelectionMode, ShardSelector, ThreadRandom},
};

/// Tunables for an [`IdGenerator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub selection: SelectionMode,
    pub parse_policy: ParsePolicy,
}

/// Turns fallible per-shard increments into a reliable ID source.
///
/// Each call to [`IdGenerator::generate_unique_id`] makes up to `N` attempts,
/// `N` being the number of connected clients. Every attempt routes to a
/// randomly selected shard; the first success wins. Per-shard failures
/// (overflow, version conflict, connectivity) only move the call on to the
/// next attempt.
///
/// No client-side locking is involved: concurrent callers, in this process or
/// others, are linearized by the coordination service's version check.
///
/// ## See Also
/// - [`SequenceAllocator`]
/// - [`initialize_all`](crate::initialize_all)
pub struct IdGenerator<P, S = ThreadRandom> {
    pool: P,
    layout: ShardLayout,
    allocator: SequenceAllocator,
    selector: S,
    selection: SelectionMode,
}

impl<P: ConnectionPool> IdGenerator<P> {
    /// Creates a generator with the default [`GeneratorConfig`] and the
    /// thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `layout` fails
    /// [`ShardLayout::validate`].
    pub fn new(pool: P, layout: ShardLayout) -> Result<Self> {
        Self::with_config(pool, layout, GeneratorConfig::default())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `layout` fails
    /// [`ShardLayout::validate`].
    pub fn with_config(pool: P, layout: ShardLayout, config: GeneratorConfig) -> Result<Self> {
        Self::with_selector(pool, layout, config, ThreadRandom)
    }
}

impl<P, S> IdGenerator<P, S>
where
    P: ConnectionPool,
    S: ShardSelector,
{
    /// Creates a generator that picks shards with `selector`.
    ///
    /// The layout is validated here so that no two shards can hand out the
    /// same ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `layout` fails
    /// [`ShardLayout::validate`].
    pub fn with_selector(
        pool: P,
        layout: ShardLayout,
        config: GeneratorConfig,
        selector: S,
    ) -> Result<Self> {
        layout.validate()?;
        let allocator =
            SequenceAllocator::new(layout.max_sequence()).with_parse_policy(config.parse_policy);
        Ok(Self {
            pool,
            layout,
            allocator,
            selector,
            selection: config.selection,
        })
    }

    pub const fn pool(&self) -> &P {
        &self.pool
    }

    pub const fn layout(&self) -> &ShardLayout {
        &self.layout
    }

    /// Allocates one globally unique ID.
    ///
    /// ```text
    /// Selecting -> Allocating -> Success
    ///                         -> Retrying -> Selecting   (attempts < N)
    ///                                     -> Failed      (attempts == N)
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllShardsExhausted`] after exactly `N` failed attempts,
    /// carrying every recorded failure. With no connected clients, `N` is
    /// zero and the call fails immediately.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn generate_unique_id(&self) -> Result<u64> {
        let clients = self.pool.connected_clients();
        let shard_count = clients.len().min(self.layout.len());
        let mut failures = Vec::new();

        for index in AttemptPlan::new(&self.selector, self.selection, shard_count) {
            let shard = &self.layout.shards()[index];
            match self
                .allocator
                .increment(&clients[index], &shard.counter_path, shard.offset)
                .await
            {
                Ok(id) => return Ok(id),
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(shard = index, %error, "Failed to increment counter");
                    failures.push(AttemptFailure {
                        shard: index,
                        error,
                    });
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::error!(attempts = failures.len(), "All shards failed");
        Err(Error::AllShardsExhausted {
            attempts: failures.len(),
            failures,
        })
    }
}
