//! Pair publish and stats handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use tracing::info;

use pairhub_realtime::PairKey;
use pairhub_realtime::message::validator::validate_pair;

use crate::dto::response::{ApiResponse, BroadcastResponse, PairStatsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/pairs/{pair}/broadcast
///
/// Queues the JSON body to every subscriber of `pair`.
pub async fn broadcast(
    State(state): State<AppState>,
    Path(pair): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<BroadcastResponse>>, ApiError> {
    validate_pair(&pair)?;

    let delivered = state.realtime.pairs.broadcast(&pair, &body);
    let key = PairKey::new(&pair);

    info!(pair = %key, delivered, "Pair broadcast published");

    Ok(Json(ApiResponse::ok(BroadcastResponse {
        pair: key.as_str().to_string(),
        delivered,
    })))
}

/// GET /api/pairs/{pair}
pub async fn pair_stats(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> Result<Json<ApiResponse<PairStatsResponse>>, ApiError> {
    validate_pair(&pair)?;

    let subscribers = state.realtime.pairs.subscriber_count(&pair);

    Ok(Json(ApiResponse::ok(PairStatsResponse {
        pair: PairKey::new(&pair).as_str().to_string(),
        subscribers,
    })))
}
