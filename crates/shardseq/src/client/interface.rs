use bytes::Bytes;
use core::{fmt, future::Future};
use std::sync::Arc;

use crate::client::ClientError;

/// Opaque version token of a node.
///
/// Every successful write bumps the version. A version-guarded write only
/// succeeds if the caller's token still matches the node's current one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u64);

impl Version {
    /// The version of a freshly created node.
    pub const INITIAL: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version a node carries after one more successful write.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata returned alongside node reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStat {
    pub version: Version,
    pub data_length: usize,
}

/// How long a created node lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreateMode {
    /// The node survives client disconnects and session expiry.
    #[default]
    Persistent,
    /// The node is removed when the creating session ends.
    Ephemeral,
}

/// A handle onto one coordination-service ensemble.
///
/// Each call is a network round trip: it suspends the calling task until the
/// service answers with a value or a [`ClientError`]. Connection setup,
/// session management and transport retries belong to the implementation.
///
/// Hierarchical services such as ZooKeeper refuse to create a node whose
/// parent does not exist yet and answer with [`ClientError::NoNode`];
/// The in-process `MemoryClient` does not enforce parents.
/// [`initialize_all`](crate::initialize_all) creates the base node and the
/// counter nodes concurrently, so against such a service the counter create
/// may race ahead of its parent and fail until provisioning is retried.
///
/// # Example
/// ```
/// # #[cfg(feature = "memory")]
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// use shardseq::{ClientError, CoordinationClient, CreateMode, MemoryClient};
///
/// let client = MemoryClient::new();
/// client.create("/counter", b"0", CreateMode::Persistent).await.unwrap();
///
/// let (data, stat) = client.get_data("/counter").await.unwrap();
/// assert_eq!(&data[..], b"0");
///
/// client.set_data("/counter", b"1", stat.version).await.unwrap();
/// let stale = client.set_data("/counter", b"2", stat.version).await;
/// assert!(matches!(stale, Err(ClientError::BadVersion { .. })));
/// # });
/// ```
pub trait CoordinationClient: Send + Sync {
    /// Returns the node's metadata, or `None` when no node lives at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached.
    fn exists(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<NodeStat>, ClientError>> + Send;

    /// Creates a node holding `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NodeExists`] if the path is taken,
    /// [`ClientError::NoNode`] if the service requires a parent that is
    /// missing, or a transport error.
    fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Reads the node's data together with its current version.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoNode`] if the path is empty, or a transport
    /// error.
    fn get_data(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<(Bytes, NodeStat), ClientError>> + Send;

    /// Replaces the node's data if its version still equals `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BadVersion`] when another writer got there
    /// first, [`ClientError::NoNode`] if the node is gone, or a transport
    /// error.
    fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: Version,
    ) -> impl Future<Output = Result<NodeStat, ClientError>> + Send;
}

impl<C: CoordinationClient + ?Sized> CoordinationClient for Arc<C> {
    fn exists(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<NodeStat>, ClientError>> + Send {
        (**self).exists(path)
    }

    fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).create(path, data, mode)
    }

    fn get_data(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<(Bytes, NodeStat), ClientError>> + Send {
        (**self).get_data(path)
    }

    fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: Version,
    ) -> impl Future<Output = Result<NodeStat, ClientError>> + Send {
        (**self).set_data(path, data, version)
    }
}
