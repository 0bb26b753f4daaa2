//! mediadash agent: aggregates the media stack's status and streams it, plus
//! tailed logs, to connected viewers.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod probes;
pub mod state;
pub mod tail;
pub mod types;
pub mod ws;

use axum::{routing::get, Router};

use crate::state::AppState;

/// All routes served by the agent.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/status", get(api::status))
        .route("/api/logs/:type", get(api::logs))
        .with_state(state)
}
