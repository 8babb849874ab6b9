//! Log output for the server.
//!
//! Events are rendered by `tracing_subscriber::fmt` and filtered through
//! `RUST_LOG` (default `info`). Library events from `shardseq` (node creation,
//! per-shard failures, exhausted requests) flow through the same subscriber.
//!
//! ```bash
//! RUST_LOG=shardseq=debug,info cargo run --bin shardseq-server
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .try_init()?;

    Ok(())
}
