//! Idempotent provisioning of the base node and every shard's counter node.

use futures::future::{join, join_all};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    client::{ClientError, CoordinationClient, CreateMode},
    error::{Error, Result},
    layout::ShardLayout,
    pool::ConnectionPool,
};

/// Value a counter node is created with.
pub const INITIAL_COUNTER_VALUE: &[u8] = b"0";

/// Value the shared base node is created with.
pub const BASE_NODE_VALUE: &[u8] = b"0";

/// Ensures a persistent node exists at `path`, creating it with
/// `initial_value` if absent.
///
/// A node that already exists is left unchanged, including when a concurrent
/// initializer creates it between the existence check and the create.
///
/// # Errors
///
/// Returns [`Error::Connectivity`] for any client failure other than the
/// benign "node already exists" race.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(client, initial_value)))]
pub async fn ensure_node_exists<C>(client: &C, path: &str, initial_value: &[u8]) -> Result<()>
where
    C: CoordinationClient + ?Sized,
{
    let stat = client
        .exists(path)
        .await
        .map_err(|e| Error::connectivity(path, e))?;
    if stat.is_some() {
        return Ok(());
    }

    match client
        .create(path, initial_value, CreateMode::Persistent)
        .await
    {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(path, "Created node");
            Ok(())
        }
        Err(ClientError::NodeExists { .. }) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(path, "Node created concurrently by another initializer");
            Ok(())
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::error!(path, error = %e, "Failed to create node");
            Err(Error::connectivity(path, e))
        }
    }
}

/// Provisions the base node and each shard's counter node on every connected
/// client, concurrently.
///
/// Every shard is driven to completion even if another shard fails; the first
/// error (in shard order) is then returned.
///
/// # Errors
///
/// - [`Error::NoClientsConnected`] if the pool is empty; no node operation is
///   issued
/// - [`Error::ShardCountMismatch`] if the pool has more clients than the layout
///   has shards
/// - [`Error::InvalidLayout`] if `layout` fails [`ShardLayout::validate`]
/// - [`Error::Connectivity`] if any node could not be ensured
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(base_path = layout.base_path())))]
pub async fn initialize_all<P>(pool: &P, layout: &ShardLayout) -> Result<()>
where
    P: ConnectionPool + ?Sized,
{
    let clients = pool.connected_clients();
    if clients.is_empty() {
        return Err(Error::NoClientsConnected);
    }
    if clients.len() > layout.len() {
        return Err(Error::ShardCountMismatch {
            clients: clients.len(),
            shards: layout.len(),
        });
    }
    layout.validate()?;

    let base_path = layout.base_path();
    let results = join_all(clients.iter().zip(layout.shards()).map(|(client, shard)| {
        join(
            ensure_node_exists(client, base_path, BASE_NODE_VALUE),
            ensure_node_exists(client, &shard.counter_path, INITIAL_COUNTER_VALUE),
        )
    }))
    .await;

    for (base, counter) in results {
        base?;
        counter?;
    }

    #[cfg(feature = "tracing")]
    tracing::info!(shards = clients.len(), "Counter nodes initialized");
    Ok(())
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::{MemoryClient, StaticPool};

    fn pool_of(n: usize) -> StaticPool<MemoryClient> {
        StaticPool::new((0..n).map(|_| MemoryClient::new()).collect())
    }

    fn value(client: &MemoryClient, path: &str) -> Option<String> {
        client
            .node(path)
            .map(|(data, _)| String::from_utf8(data.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn creates_base_and_counter_nodes_on_every_shard() {
        let layout = ShardLayout::new("/id-counter", 3);
        let pool = pool_of(3);

        initialize_all(&pool, &layout).await.unwrap();

        for (client, shard) in pool.connected_clients().iter().zip(layout.shards()) {
            assert_eq!(value(client, "/id-counter").as_deref(), Some("0"));
            assert_eq!(value(client, &shard.counter_path).as_deref(), Some("0"));
        }
        // Only shard 0's counter lives on client 0.
        assert!(value(&pool.connected_clients()[0], "/id-counter/shard-1").is_none());
    }

    #[tokio::test]
    async fn leaves_existing_counters_unchanged() {
        let layout = ShardLayout::new("/id-counter", 2);
        let pool = pool_of(2);
        pool.connected_clients()[1].put_raw("/id-counter/shard-1", "42");

        initialize_all(&pool, &layout).await.unwrap();
        initialize_all(&pool, &layout).await.unwrap();

        let clients = pool.connected_clients();
        assert_eq!(value(&clients[0], "/id-counter/shard-0").as_deref(), Some("0"));
        assert_eq!(value(&clients[1], "/id-counter/shard-1").as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn concurrent_initializers_both_succeed() {
        let layout = ShardLayout::new("/id-counter", 4);
        let pool = pool_of(4);

        let (a, b) = tokio::join!(
            initialize_all(&pool, &layout),
            initialize_all(&pool, &layout)
        );
        a.unwrap();
        b.unwrap();

        for (client, shard) in pool.connected_clients().iter().zip(layout.shards()) {
            let (data, version) = client.node(&shard.counter_path).unwrap();
            assert_eq!(&data[..], b"0");
            assert_eq!(version.get(), 0);
        }
    }

    #[tokio::test]
    async fn no_clients_fails_without_node_operations() {
        let layout = ShardLayout::new("/id-counter", 2);
        let client = MemoryClient::new();
        let pool = StaticPool::new(vec![client.clone()]);
        pool.close();

        let err = initialize_all(&pool, &layout).await.unwrap_err();
        assert!(matches!(err, Error::NoClientsConnected));
        assert_eq!(client.operation_count(), 0);

        let empty: StaticPool<MemoryClient> = StaticPool::new(Vec::new());
        assert!(matches!(
            initialize_all(&empty, &layout).await,
            Err(Error::NoClientsConnected)
        ));
    }

    #[tokio::test]
    async fn more_clients_than_shards_is_rejected() {
        let layout = ShardLayout::new("/id-counter", 1);
        let pool = pool_of(2);

        let err = initialize_all(&pool, &layout).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ShardCountMismatch { clients: 2, shards: 1 }
        ));
    }

    #[tokio::test]
    async fn overlapping_layout_is_rejected_before_any_node_operation() {
        let layout = ShardLayout::new("/id-counter", 2).with_max_sequence(1_000_000);
        let pool = pool_of(2);

        let err = initialize_all(&pool, &layout).await.unwrap_err();
        assert!(matches!(err, Error::InvalidLayout { .. }));
        for client in pool.connected_clients() {
            assert_eq!(client.operation_count(), 0);
        }
    }

    #[tokio::test]
    async fn one_failing_shard_does_not_stop_the_others() {
        let layout = ShardLayout::new("/id-counter", 3);
        let pool = pool_of(3);
        pool.connected_clients()[1].disconnect();

        let err = initialize_all(&pool, &layout).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connectivity { source: ClientError::ConnectionLoss { .. }, .. }
        ));

        let clients = pool.connected_clients();
        assert!(value(&clients[0], "/id-counter/shard-0").is_some());
        assert!(value(&clients[2], "/id-counter/shard-2").is_some());
        assert!(value(&clients[1], "/id-counter/shard-1").is_none());
    }

    #[tokio::test]
    async fn ensure_node_exists_is_idempotent() {
        let client = MemoryClient::new();

        ensure_node_exists(&client, "/n", b"5").await.unwrap();
        client.put_raw("/n", "6");
        ensure_node_exists(&client, "/n", b"5").await.unwrap();

        assert_eq!(value(&client, "/n").as_deref(), Some("6"));
    }
}
