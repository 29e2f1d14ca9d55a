//! HTTP handlers for reorder policy endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{Drug, ReorderCalculation};
use crate::services::reorder::{BatchResult, ReorderService, ReorderSettings};
use crate::AppState;

fn service(state: &AppState) -> ReorderService {
    ReorderService::new(
        state.db.clone(),
        state.forecast.clone(),
        ReorderSettings::from_config(&state.config),
    )
}

/// Recompute reorder policies for all drugs
///
/// Returns partial success: per-drug failures are counted and listed, never
/// fatal to the batch.
pub async fn recalculate_all(State(state): State<AppState>) -> AppResult<Json<BatchResult>> {
    let result = service(&state).recalculate_all().await?;
    Ok(Json(result))
}

/// Recompute the reorder policy for one drug
pub async fn recalculate_drug(
    State(state): State<AppState>,
    Path(drug_id): Path<i32>,
) -> AppResult<Json<ReorderCalculation>> {
    let calculation = service(&state).recalculate_drug(drug_id).await?;
    Ok(Json(calculation))
}

/// Query parameters for calculation history
#[derive(Debug, Deserialize)]
pub struct CalculationHistoryQuery {
    pub limit: Option<i64>,
}

/// Calculation history for a drug, latest first
pub async fn get_calculations(
    State(state): State<AppState>,
    Path(drug_id): Path<i32>,
    Query(query): Query<CalculationHistoryQuery>,
) -> AppResult<Json<Vec<ReorderCalculation>>> {
    let calculations = service(&state)
        .get_calculations(drug_id, query.limit.unwrap_or(50))
        .await?;
    Ok(Json(calculations))
}

/// Accept the latest recommendation as the drug's manual reorder level
pub async fn accept_recommendation(
    State(state): State<AppState>,
    Path(drug_id): Path<i32>,
) -> AppResult<Json<Drug>> {
    let drug = service(&state).accept_recommendation(drug_id).await?;
    Ok(Json(drug))
}
