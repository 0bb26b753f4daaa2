//! Pull endpoints: one-shot status snapshot and historical log lines.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

fn internal_error(msg: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
}

pub async fn status(State(state): State<AppState>) -> Response {
    match state.aggregator.gather_guarded().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            error!("status request failed: {e}");
            internal_error(e.to_string())
        }
    }
}

pub async fn logs(State(state): State<AppState>, Path(log_type): Path<String>) -> Response {
    match state
        .tails
        .tail_lines(&log_type, state.config.tail_pull_lines)
        .await
    {
        Ok(lines) => Json(json!({ "lines": lines })).into_response(),
        Err(e) => {
            error!("reading log {log_type:?} failed: {e}");
            internal_error(e.to_string())
        }
    }
}
