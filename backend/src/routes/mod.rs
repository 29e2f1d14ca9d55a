//! Route definitions for the Pharma Inventory Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Inventory snapshots
        .nest("/inventory", inventory_routes())
        // Reorder policy engine
        .nest("/reorder", reorder_routes())
        // Alert lifecycle
        .nest("/alerts", alert_routes())
        // Forecast service visibility
        .route("/forecast/health", get(handlers::forecast_health))
}

/// Inventory snapshot routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/snapshots", post(handlers::record_snapshot))
        .route("/:drug_id/current", get(handlers::get_current_stock))
}

/// Reorder policy routes
fn reorder_routes() -> Router<AppState> {
    Router::new()
        .route("/recalculate", post(handlers::recalculate_all))
        .route("/recalculate/:drug_id", post(handlers::recalculate_drug))
        .route("/calculations/:drug_id", get(handlers::get_calculations))
        .route("/:drug_id/accept", post(handlers::accept_recommendation))
}

/// Alert lifecycle routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/check", post(handlers::check_alerts))
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/:alert_id/acknowledge", post(handlers::acknowledge_alert))
        .route("/:alert_id/dismiss", post(handlers::dismiss_alert))
        .route("/:alert_id/read", post(handlers::mark_alert_read))
        .route("/:alert_id/history", get(handlers::get_alert_history))
}
