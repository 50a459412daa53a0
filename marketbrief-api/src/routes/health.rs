/// Liveness probe
///
/// `GET /health` always answers 200. A dead database pool is reported as
/// `"degraded"` / `"disconnected"` in the body rather than as an error, so
/// an orchestrator can tell "process up, storage down" apart from "process
/// gone".

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use marketbrief_shared::db::pool;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_up = pool::health_check(&state.db).await.is_ok();

    Ok(Json(HealthResponse {
        status: if database_up { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_up { "connected" } else { "disconnected" },
    }))
}
