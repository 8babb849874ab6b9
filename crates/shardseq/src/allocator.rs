//! Single-shard, single-attempt counter increment.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    client::{ClientError, CoordinationClient},
    error::{Error, Result},
};

/// What to do with a stored counter value that is not a decimal integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Treat an empty or unparseable value as `0` and log a warning.
    ///
    /// A corrupted counter then restarts from the bottom of its shard's range
    /// and can hand out IDs that were already issued.
    #[default]
    ZeroOnCorrupt,
    /// Fail the attempt with [`Error::CorruptCounter`]. An empty value still
    /// reads as `0`.
    Reject,
}

/// Performs one optimistic-concurrency increment of a shard's counter.
///
/// The allocator never retries: a version conflict or an exhausted counter is
/// reported to the caller, which decides whether to try another shard.
#[derive(Clone, Copy, Debug)]
pub struct SequenceAllocator {
    max_sequence: u64,
    parse_policy: ParsePolicy,
}

impl SequenceAllocator {
    /// Creates an allocator that refuses counters above `max_sequence`.
    pub const fn new(max_sequence: u64) -> Self {
        Self {
            max_sequence,
            parse_policy: ParsePolicy::ZeroOnCorrupt,
        }
    }

    #[must_use]
    pub const fn with_parse_policy(mut self, parse_policy: ParsePolicy) -> Self {
        self.parse_policy = parse_policy;
        self
    }

    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    pub const fn parse_policy(&self) -> ParsePolicy {
        self.parse_policy
    }

    /// Increments the counter at `path` and returns `offset + value + 1`.
    ///
    /// 1. Reads the current value and version.
    /// 2. Fails with [`Error::SequenceOverflow`] if the value exceeds the
    ///    maximum; nothing is written.
    /// 3. Writes `value + 1` guarded by the version that was read.
    ///
    /// # Errors
    ///
    /// - [`Error::Connectivity`] if the read or the write fails at the client
    /// - [`Error::SequenceOverflow`] if the counter is exhausted
    /// - [`Error::ConcurrentModification`] if another writer won the race
    /// - [`Error::CorruptCounter`] under [`ParsePolicy::Reject`]
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, client)))]
    pub async fn increment<C>(&self, client: &C, path: &str, offset: u64) -> Result<u64>
    where
        C: CoordinationClient + ?Sized,
    {
        let (data, stat) = client
            .get_data(path)
            .await
            .map_err(|e| Error::connectivity(path, e))?;

        let current = self.parse(path, &data)?;
        if current > self.max_sequence {
            return Err(self.overflow(path, current));
        }

        let (next, id) = current
            .checked_add(1)
            .and_then(|next| Some((next, offset.checked_add(next)?)))
            .ok_or_else(|| self.overflow(path, current))?;

        match client
            .set_data(path, next.to_string().as_bytes(), stat.version)
            .await
        {
            Ok(_) => Ok(id),
            Err(ClientError::BadVersion { .. }) => Err(Error::ConcurrentModification {
                path: path.to_owned(),
                version: stat.version,
            }),
            Err(e) => Err(Error::connectivity(path, e)),
        }
    }

    fn parse(&self, path: &str, data: &[u8]) -> Result<u64> {
        let raw = String::from_utf8_lossy(data);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        match trimmed.parse::<u64>() {
            Ok(value) => Ok(value),
            Err(_) => match self.parse_policy {
                ParsePolicy::ZeroOnCorrupt => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(path, raw = %trimmed, "Unparseable counter value, reading as 0");
                    Ok(0)
                }
                ParsePolicy::Reject => Err(Error::CorruptCounter {
                    path: path.to_owned(),
                    raw: trimmed.to_owned(),
                }),
            },
        }
    }

    fn overflow(&self, path: &str, value: u64) -> Error {
        Error::SequenceOverflow {
            path: path.to_owned(),
            value,
            max: self.max_sequence,
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::{CreateMode, MemoryClient};

    const PATH: &str = "/id-counter/shard-1";
    const OFFSET: u64 = 2_000_000;

    async fn client_with(value: &str) -> MemoryClient {
        let client = MemoryClient::new();
        client
            .create(PATH, value.as_bytes(), CreateMode::Persistent)
            .await
            .unwrap();
        client
    }

    fn stored(client: &MemoryClient) -> String {
        let (data, _) = client.node(PATH).unwrap();
        String::from_utf8(data.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn increments_strictly_by_one() {
        let client = client_with("0").await;
        let allocator = SequenceAllocator::new(100);

        for expected in 1..=50 {
            let id = allocator.increment(&client, PATH, OFFSET).await.unwrap();
            assert_eq!(id, OFFSET + expected);
        }
        assert_eq!(stored(&client), "50");
    }

    #[tokio::test]
    async fn racing_increments_advance_counter_once() {
        let client = client_with("7").await;
        let allocator = SequenceAllocator::new(100);

        let (a, b) = tokio::join!(
            allocator.increment(&client, PATH, OFFSET),
            allocator.increment(&client, PATH, OFFSET),
        );

        let results = [a, b];
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(Error::ConcurrentModification { .. })))
            .count();

        assert_eq!(winners, [&(OFFSET + 8)]);
        assert_eq!(conflicts, 1);
        assert_eq!(stored(&client), "8");
    }

    #[tokio::test]
    async fn exhausted_counter_is_left_untouched() {
        let client = client_with("101").await;
        let allocator = SequenceAllocator::new(100);

        for _ in 0..3 {
            let err = allocator.increment(&client, PATH, OFFSET).await.unwrap_err();
            assert!(matches!(
                err,
                Error::SequenceOverflow { value: 101, max: 100, .. }
            ));
        }
        assert_eq!(stored(&client), "101");
        assert_eq!(client.node(PATH).unwrap().1.get(), 0);
    }

    #[tokio::test]
    async fn counter_at_max_yields_one_last_id() {
        let client = client_with("100").await;
        let allocator = SequenceAllocator::new(100);

        let id = allocator.increment(&client, PATH, OFFSET).await.unwrap();
        assert_eq!(id, OFFSET + 101);

        let err = allocator.increment(&client, PATH, OFFSET).await.unwrap_err();
        assert!(matches!(err, Error::SequenceOverflow { .. }));
    }

    #[tokio::test]
    async fn empty_value_reads_as_zero() {
        let client = client_with("").await;
        let allocator = SequenceAllocator::new(100).with_parse_policy(ParsePolicy::Reject);

        let id = allocator.increment(&client, PATH, OFFSET).await.unwrap();
        assert_eq!(id, OFFSET + 1);
    }

    #[tokio::test]
    async fn corrupt_value_follows_parse_policy() {
        let client = client_with("not-a-number").await;

        let strict = SequenceAllocator::new(100).with_parse_policy(ParsePolicy::Reject);
        let err = strict.increment(&client, PATH, OFFSET).await.unwrap_err();
        assert!(matches!(err, Error::CorruptCounter { ref raw, .. } if raw == "not-a-number"));
        assert_eq!(stored(&client), "not-a-number");

        let lenient = SequenceAllocator::new(100);
        let id = lenient.increment(&client, PATH, OFFSET).await.unwrap();
        assert_eq!(id, OFFSET + 1);
        assert_eq!(stored(&client), "1");
    }

    #[tokio::test]
    async fn missing_node_and_lost_connection_are_connectivity_errors() {
        let client = MemoryClient::new();
        let allocator = SequenceAllocator::new(100);

        let err = allocator.increment(&client, PATH, OFFSET).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connectivity { source: ClientError::NoNode { .. }, .. }
        ));

        client.put_raw(PATH, "3");
        client.disconnect();
        let err = allocator.increment(&client, PATH, OFFSET).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connectivity { source: ClientError::ConnectionLoss { .. }, .. }
        ));
        assert_eq!(stored(&client), "3");
    }

    #[tokio::test]
    async fn id_overflow_is_reported_not_wrapped() {
        let client = client_with("5").await;
        let allocator = SequenceAllocator::new(u64::MAX);

        let err = allocator
            .increment(&client, PATH, u64::MAX - 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SequenceOverflow { value: 5, .. }));
    }
}
