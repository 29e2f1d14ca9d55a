//! HTTP handlers for inventory snapshot endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::InventorySnapshot;
use crate::services::inventory::{InventoryService, RecordSnapshotInput};
use crate::AppState;

/// Record a daily inventory snapshot (merged into any same-day row)
pub async fn record_snapshot(
    State(state): State<AppState>,
    Json(input): Json<RecordSnapshotInput>,
) -> AppResult<Json<InventorySnapshot>> {
    let service = InventoryService::new(state.db);
    let snapshot = service.record_snapshot(input).await?;
    Ok(Json(snapshot))
}

/// Current stock for a drug, from the latest snapshot
pub async fn get_current_stock(
    State(state): State<AppState>,
    Path(drug_id): Path<i32>,
) -> AppResult<Json<CurrentStockResponse>> {
    let service = InventoryService::new(state.db);
    let snapshot = service.latest_snapshot(drug_id).await?;

    let response = match snapshot {
        Some(s) => CurrentStockResponse {
            drug_id,
            current_stock: s.closing_stock as i64,
            stockout: s.stockout_flag,
            as_of: Some(s.snapshot_date),
        },
        None => CurrentStockResponse {
            drug_id,
            current_stock: 0,
            stockout: false,
            as_of: None,
        },
    };

    Ok(Json(response))
}

/// Current stock response
#[derive(Debug, Serialize)]
pub struct CurrentStockResponse {
    pub drug_id: i32,
    pub current_stock: i64,
    pub stockout: bool,
    pub as_of: Option<NaiveDate>,
}
