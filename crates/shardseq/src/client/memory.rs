use bytes::Bytes;
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{collections::BTreeMap, sync::Arc};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::client::{ClientError, CoordinationClient, CreateMode, NodeStat, Version};

#[derive(Debug, Clone)]
struct Node {
    data: Bytes,
    version: Version,
    mode: CreateMode,
}

impl Node {
    fn stat(&self) -> NodeStat {
        NodeStat {
            version: self.version,
            data_length: self.data.len(),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    nodes: Mutex<BTreeMap<String, Node>>,
    disconnected: AtomicBool,
    operations: AtomicUsize,
}

/// An in-process coordination ensemble.
///
/// Each [`MemoryClient`] created with [`MemoryClient::new`] owns an
/// independent node store; clones share it. Every call yields to the scheduler
/// once before touching the store, the way a network round trip would, so
/// concurrent callers interleave between their reads and writes.
///
/// ## Recommended When
/// - Running tests or benchmarks without a live ensemble
/// - Serving IDs from a single standalone process
///
/// Nodes never outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    store: Arc<Store>,
}

impl MemoryClient {
    /// Creates a handle onto a new, empty node store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`ClientError::ConnectionLoss`].
    pub fn disconnect(&self) {
        self.store.disconnected.store(true, Ordering::Release);
    }

    /// Restores connectivity after [`MemoryClient::disconnect`].
    pub fn reconnect(&self) {
        self.store.disconnected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        !self.store.disconnected.load(Ordering::Acquire)
    }

    /// Number of calls that reached the store, including failed ones.
    pub fn operation_count(&self) -> usize {
        self.store.operations.load(Ordering::Relaxed)
    }

    /// Returns a node's data and version without counting as an operation.
    pub fn node(&self, path: &str) -> Option<(Bytes, Version)> {
        self.store
            .nodes
            .lock()
            .get(path)
            .map(|node| (node.data.clone(), node.version))
    }

    /// Overwrites (or creates) a node unconditionally, bumping its version.
    ///
    /// Simulates an external writer, e.g. an operator reset or a corrupting
    /// client.
    pub fn put_raw(&self, path: &str, data: impl Into<Bytes>) {
        let mut nodes = self.store.nodes.lock();
        let data = data.into();
        match nodes.get_mut(path) {
            Some(node) => {
                node.data = data;
                node.version = node.version.next();
            }
            None => {
                nodes.insert(
                    path.to_owned(),
                    Node {
                        data,
                        version: Version::INITIAL,
                        mode: CreateMode::Persistent,
                    },
                );
            }
        }
    }

    /// Drops every ephemeral node, as the service does when a session ends.
    pub fn expire_session(&self) {
        self.store
            .nodes
            .lock()
            .retain(|_, node| node.mode == CreateMode::Persistent);
    }

    async fn round_trip(&self) -> Result<(), ClientError> {
        tokio::task::yield_now().await;
        self.store.operations.fetch_add(1, Ordering::Relaxed);
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::ConnectionLoss {
                reason: "memory ensemble disconnected".to_owned(),
            })
        }
    }
}

impl CoordinationClient for MemoryClient {
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, ClientError> {
        self.round_trip().await?;
        Ok(self.store.nodes.lock().get(path).map(Node::stat))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, data)))]
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<(), ClientError> {
        self.round_trip().await?;
        let mut nodes = self.store.nodes.lock();
        if nodes.contains_key(path) {
            return Err(ClientError::NodeExists {
                path: path.to_owned(),
            });
        }
        nodes.insert(
            path.to_owned(),
            Node {
                data: Bytes::copy_from_slice(data),
                version: Version::INITIAL,
                mode,
            },
        );
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    async fn get_data(&self, path: &str) -> Result<(Bytes, NodeStat), ClientError> {
        self.round_trip().await?;
        self.store
            .nodes
            .lock()
            .get(path)
            .map(|node| (node.data.clone(), node.stat()))
            .ok_or_else(|| ClientError::NoNode {
                path: path.to_owned(),
            })
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, data)))]
    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: Version,
    ) -> Result<NodeStat, ClientError> {
        self.round_trip().await?;
        let mut nodes = self.store.nodes.lock();
        let node = nodes.get_mut(path).ok_or_else(|| ClientError::NoNode {
            path: path.to_owned(),
        })?;
        if node.version != version {
            return Err(ClientError::BadVersion {
                path: path.to_owned(),
                expected: version,
                actual: node.version,
            });
        }
        node.data = Bytes::copy_from_slice(data);
        node.version = node.version.next();
        Ok(node.stat())
    }
}
