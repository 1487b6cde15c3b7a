use crate::constants::MAX_HEADERS_PER_REQUEST;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use backsync_core::chain::{Chain, ChainStore};
use backsync_core::{hash_hex, parse_hash, Block, BlockHeader, Hash};
use backsync_engine::SyncConfig;
use backsync_storage::SledStore;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub chain: Chain<SledStore>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct Head {
    pub height: u64,
    pub hash: Option<String>,
}

#[derive(Deserialize)]
struct HeadersQuery {
    limit: Option<u32>,
}

type ApiError = (StatusCode, String);

fn bad_hash(raw: &str) -> Result<Hash, ApiError> {
    parse_hash(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn internal(e: anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}

async fn head(State(state): State<AppState>) -> Result<Json<Head>, ApiError> {
    let (height, hash) = state.chain.tip().map_err(internal)?;
    Ok(Json(Head {
        height,
        hash: hash.as_ref().map(hash_hex),
    }))
}

/// Headers from `hash` toward genesis. Unknown hashes yield an empty list.
async fn headers(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<HeadersQuery>,
) -> Result<Json<Vec<BlockHeader>>, ApiError> {
    let hash = bad_hash(&raw)?;
    let limit = query
        .limit
        .unwrap_or(SyncConfig::default().batch_size)
        .clamp(1, MAX_HEADERS_PER_REQUEST);
    let headers = state
        .chain
        .headers_descending(&hash, limit as usize)
        .map_err(internal)?;
    Ok(Json(headers))
}

async fn block(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let hash = bad_hash(&raw)?;
    match state.chain.store().get_block_by_hash(&hash).map_err(internal)? {
        Some(block) => Ok(Json(block)),
        None => Err((StatusCode::NOT_FOUND, format!("unknown block {raw}"))),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/healthz", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain/head", get(head))
        .route("/headers/{hash}", get(headers))
        .route("/blocks/{hash}", get(block))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
