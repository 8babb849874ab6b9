//! Connection pool contract and a fixed-size implementation.
//!
//! The pool is handed to [`initialize_all`] and [`IdGenerator`] explicitly;
//! the embedding process owns its lifecycle (connect at startup, [`close`] at
//! shutdown).
//!
//! [`initialize_all`]: crate::initialize_all
//! [`IdGenerator`]: crate::IdGenerator
//! [`close`]: StaticPool::close

use portable_atomic::{AtomicBool, Ordering};

use crate::client::CoordinationClient;

/// Source of connected coordination clients, one per shard.
///
/// The returned slice is ordered and index-stable for the lifetime of the
/// pool: client `i` serves the `i`-th counter path and the `i`-th offset of
/// the [`ShardLayout`].
///
/// [`ShardLayout`]: crate::ShardLayout
pub trait ConnectionPool: Send + Sync {
    type Client: CoordinationClient;

    /// Returns the connected clients, in shard order.
    fn connected_clients(&self) -> &[Self::Client];
}

/// A pool over a fixed, already-connected set of clients.
///
/// After [`StaticPool::close`] the pool reports no connected clients, so
/// initialization fails fast and every ID request fails with
/// [`Error::AllShardsExhausted`].
///
/// [`Error::AllShardsExhausted`]: crate::Error::AllShardsExhausted
#[derive(Debug)]
pub struct StaticPool<C> {
    clients: Vec<C>,
    closed: AtomicBool,
}

impl<C: CoordinationClient> StaticPool<C> {
    pub const fn new(clients: Vec<C>) -> Self {
        Self {
            clients,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of clients the pool was built with, open or not.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops handing out clients.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::info!(clients = self.clients.len(), "Connection pool closed");
        }
    }
}

impl<C: CoordinationClient> ConnectionPool for StaticPool<C> {
    type Client = C;

    fn connected_clients(&self) -> &[C] {
        if self.is_closed() { &[] } else { &self.clients }
    }
}

impl<P: ConnectionPool + ?Sized> ConnectionPool for std::sync::Arc<P> {
    type Client = P::Client;

    fn connected_clients(&self) -> &[Self::Client] {
        (**self).connected_clients()
    }
}
