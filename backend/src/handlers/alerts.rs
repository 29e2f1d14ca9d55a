//! HTTP handlers for alert management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Alert, AlertHistoryEntry};
use crate::services::alerts::{AlertActionInput, AlertFilter, AlertService, AlertSweepSummary};
use crate::AppState;

/// Run the alert sweep: low-stock generation plus auto-resolve
pub async fn check_alerts(State(state): State<AppState>) -> AppResult<Json<AlertSweepSummary>> {
    let service = AlertService::new(state.db);
    let summary = service.check_all().await?;
    Ok(Json(summary))
}

/// List alerts, filtered by status/type/drug
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<Vec<Alert>>> {
    let service = AlertService::new(state.db);
    let alerts = service.list_alerts(filter).await?;
    Ok(Json(alerts))
}

/// Count unread active alerts
pub async fn get_unread_count(State(state): State<AppState>) -> AppResult<Json<UnreadCountResponse>> {
    let service = AlertService::new(state.db);
    let count = service.unread_count().await?;
    Ok(Json(UnreadCountResponse { unread: count }))
}

/// Acknowledge an alert
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<AlertActionInput>,
) -> AppResult<Json<Alert>> {
    let service = AlertService::new(state.db);
    let alert = service.acknowledge(alert_id, input).await?;
    Ok(Json(alert))
}

/// Dismiss an alert
pub async fn dismiss_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<AlertActionInput>,
) -> AppResult<Json<Alert>> {
    let service = AlertService::new(state.db);
    let alert = service.dismiss(alert_id, input).await?;
    Ok(Json(alert))
}

/// Mark an alert as read
pub async fn mark_alert_read(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = AlertService::new(state.db);
    service.mark_read(alert_id).await?;
    Ok(Json(()))
}

/// Transition history for an alert
pub async fn get_alert_history(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<Vec<AlertHistoryEntry>>> {
    let service = AlertService::new(state.db);
    let history = service.get_history(alert_id).await?;
    Ok(Json(history))
}

/// Unread count response
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}
