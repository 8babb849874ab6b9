//! Error types for provisioning counters and allocating IDs.
//!
//! ## Error Cases
//! - `NoClientsConnected`: initialization ran without any connected client.
//! - `ShardCountMismatch`: the pool reports more clients than the layout has
//!   shards.
//! - `InvalidLayout`: the shard layout violates a uniqueness invariant.
//! - `Connectivity`: a coordination call failed at the transport or node
//!   level.
//! - `SequenceOverflow`: a shard counter is past its configured maximum.
//! - `ConcurrentModification`: the counter's version moved between read and
//!   write.
//! - `CorruptCounter`: a stored counter value could not be parsed (only under
//!   [`ParsePolicy::Reject`]).
//! - `AllShardsExhausted`: every attempt of one request failed.
//!
//! [`ParsePolicy::Reject`]: crate::ParsePolicy::Reject

use crate::client::{ClientError, Version};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for `shardseq`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No coordination client was available to initialize.
    #[error("no coordination clients connected")]
    NoClientsConnected,

    /// The pool and the layout disagree on the number of shards.
    #[error("pool has {clients} clients but the layout defines {shards} shards")]
    ShardCountMismatch { clients: usize, shards: usize },

    /// The shard layout is unusable.
    #[error("invalid shard layout: {reason}")]
    InvalidLayout { reason: String },

    /// A coordination call against `path` failed.
    #[error("coordination error at {path}: {source}")]
    Connectivity {
        path: String,
        #[source]
        source: ClientError,
    },

    /// The counter at `path` is past the configured maximum, or the resulting
    /// ID does not fit in a `u64`.
    #[error("sequence overflow at {path}: {value} exceeds {max}")]
    SequenceOverflow { path: String, value: u64, max: u64 },

    /// Another writer updated the counter after it was read.
    #[error("concurrent modification at {path} (read version {version})")]
    ConcurrentModification { path: String, version: Version },

    /// The stored counter value is not a decimal integer.
    #[error("corrupt counter at {path}: {raw:?}")]
    CorruptCounter { path: String, raw: String },

    /// Every attempt within a single request failed.
    #[error("all shards exhausted after {attempts} attempts")]
    AllShardsExhausted {
        attempts: usize,
        failures: Vec<AttemptFailure>,
    },
}

impl Error {
    pub(crate) fn connectivity(path: &str, source: ClientError) -> Self {
        Self::Connectivity {
            path: path.to_owned(),
            source,
        }
    }
}

/// One failed allocation attempt, recorded by the [`IdGenerator`].
///
/// [`IdGenerator`]: crate::IdGenerator
#[derive(Debug)]
pub struct AttemptFailure {
    /// Index of the shard the attempt was routed to.
    pub shard: usize,
    /// Why the shard could not produce an ID.
    pub error: Error,
}
