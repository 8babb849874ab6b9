//! HTTP routes for ID generation.
//!
//! - `GET /id` allocates one ID and answers `{"id": <u64>}`.
//! - `GET /health` answers `ok` while the pool is open.
//!
//! A request that exhausts every shard is answered with `503 Service
//! Unavailable`; callers may retry.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use shardseq::{Error, IdGenerator, MemoryClient, StaticPool};
use std::sync::Arc;

/// Generator served by this binary: one in-process ensemble per shard.
pub type Generator = IdGenerator<StaticPool<MemoryClient>>;

#[derive(Clone)]
pub struct IdService {
    generator: Arc<Generator>,
}

impl IdService {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }

    /// Stops handing out IDs; subsequent requests fail with `503`.
    pub fn shutdown(&self) {
        self.generator.pool().close();
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/id", get(next_id))
            .route("/health", get(health))
            .with_state(self.clone())
    }
}

#[derive(Serialize)]
struct IdResponse {
    id: u64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    attempts: usize,
}

async fn next_id(State(service): State<IdService>) -> Response {
    match service.generator.generate_unique_id().await {
        Ok(id) => Json(IdResponse { id }).into_response(),
        Err(err) => {
            let attempts = match &err {
                Error::AllShardsExhausted { attempts, .. } => *attempts,
                _ => 0,
            };
            tracing::warn!(error = %err, "ID request failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: err.to_string(),
                    attempts,
                }),
            )
                .into_response()
        }
    }
}

async fn health(State(service): State<IdService>) -> impl IntoResponse {
    if service.generator.pool().is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    } else {
        (StatusCode::OK, "ok")
    }
}
