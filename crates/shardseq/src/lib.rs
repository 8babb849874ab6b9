//! Sharded integer ID allocation on top of a coordination service.
//!
//! Every shard owns one persisted counter node and a fixed numeric offset. An
//! ID is produced by a version-guarded increment of one shard's counter; the
//! [`IdGenerator`] picks shards at random and fails over to others on
//! conflicts, exhausted counters or connectivity errors.
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use shardseq::{IdGenerator, MemoryClient, ShardLayout, StaticPool, initialize_all};
//!
//! let layout = ShardLayout::new("/id-counter", 3);
//! let pool = StaticPool::new((0..3).map(|_| MemoryClient::new()).collect());
//!
//! initialize_all(&pool, &layout).await.unwrap();
//!
//! let generator = IdGenerator::new(pool, layout).unwrap();
//! let id = generator.generate_unique_id().await.unwrap();
//! assert_eq!(id % 1_000_000, 1);
//! # });
//! ```

mod allocator;
mod client;
mod error;
mod generator;
mod init;
mod layout;
mod pool;
mod select;

pub use crate::allocator::*;
pub use crate::client::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::init::*;
pub use crate::layout::*;
pub use crate::pool::*;
pub use crate::select::*;
