//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::db;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let database = db::check_health(state.db()).await;
    let status = if database { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "database": database,
    }))
}
