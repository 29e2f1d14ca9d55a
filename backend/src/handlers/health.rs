//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::external::forecast::ForecastServiceHealth;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    })
}

/// Proxy the forecast service's health endpoint for ops visibility
pub async fn forecast_health(
    State(state): State<AppState>,
) -> AppResult<Json<ForecastServiceHealth>> {
    let health = state.forecast.health().await?;
    Ok(Json(health))
}
