use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{info, instrument};

use crate::error::{GraphError, GraphResult};
use crate::models::{GraphData, GraphStats, LegendEntry};
use crate::normalize::raw::RawRecord;
use crate::normalize::{legend, normalize, NormalizeOptions, Scope};
use crate::server::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeRequest {
    pub record: RawRecord,
    #[serde(default, alias = "playerId")]
    pub player_id: Option<String>,
    /// playerId -> event uuids, from the ownership query.
    #[serde(default, alias = "ownershipHints")]
    pub ownership_hints: HashMap<String, HashSet<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphResponse {
    pub data: GraphData,
    pub stats: GraphStats,
    pub execution_time_ms: u128,
    pub generated_at: DateTime<Utc>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "activity-graph-rs"
    }))
}

/// Category labels and colors, in legend order.
pub async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(legend())
}

#[instrument(skip_all)]
pub async fn normalize_handler(
    State(state): State<AppState>,
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> GraphResult<Json<GraphResponse>> {
    let Json(request) = payload.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => GraphError::PayloadTooLarge(rejection.body_text()),
        _ => GraphError::invalid_request(rejection.body_text()),
    })?;

    let start = Instant::now();
    let scope = Scope::from_player_id(request.player_id.as_deref());
    let options =
        NormalizeOptions::from_config(&state.config, scope).with_hints(request.ownership_hints);

    let data = normalize(&request.record, &options);
    let stats = GraphStats::from_graph(&data);
    let execution_time_ms = start.elapsed().as_millis();

    info!(
        "Normalize request: {} nodes, {} links in {}ms",
        stats.total_nodes, stats.total_edges, execution_time_ms
    );

    Ok(Json(GraphResponse {
        data,
        stats,
        execution_time_ms,
        generated_at: Utc::now(),
    }))
}
