//! Inventory snapshot service
//!
//! Owns the daily snapshot merge upsert and the read paths the policy and
//! alert engines consume: current stock (latest closing stock per drug) and
//! the trailing usage window for the statistical fallback.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use shared::{validate_snapshot_quantities, InventorySnapshot};

/// Inventory service for snapshot reads and the daily merge upsert
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for recording a daily snapshot
#[derive(Debug, Deserialize)]
pub struct RecordSnapshotInput {
    pub drug_id: i32,
    /// Defaults to today
    pub snapshot_date: Option<NaiveDate>,
    /// Defaults to the previous day's closing stock
    pub opening_stock: Option<i32>,
    pub quantity_received: i32,
    pub quantity_used: i32,
}

/// Database row for a snapshot
#[derive(Debug, FromRow)]
struct SnapshotRow {
    drug_id: i32,
    snapshot_date: NaiveDate,
    opening_stock: i32,
    quantity_received: i32,
    quantity_used: i32,
    closing_stock: i32,
    stockout_flag: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for InventorySnapshot {
    fn from(row: SnapshotRow) -> Self {
        InventorySnapshot {
            drug_id: row.drug_id,
            snapshot_date: row.snapshot_date,
            opening_stock: row.opening_stock,
            quantity_received: row.quantity_received,
            quantity_used: row.quantity_used,
            closing_stock: row.closing_stock,
            stockout_flag: row.stockout_flag,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a daily snapshot, merging into an existing same-day row
    ///
    /// Same-day writes accumulate received/used quantities and recompute the
    /// closing stock; they never produce a second row for the day.
    pub async fn record_snapshot(
        &self,
        input: RecordSnapshotInput,
    ) -> AppResult<InventorySnapshot> {
        self.ensure_drug_exists(input.drug_id).await?;

        let snapshot_date = input.snapshot_date.unwrap_or_else(|| Utc::now().date_naive());
        let opening_stock = match input.opening_stock {
            Some(stock) => stock,
            None => self.closing_stock_before(input.drug_id, snapshot_date).await?,
        };

        validate_snapshot_quantities(opening_stock, input.quantity_received, input.quantity_used)
            .map_err(|m| AppError::Validation {
                field: "quantities".to_string(),
                message: m.to_string(),
            })?;

        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            INSERT INTO inventory_snapshots (
                drug_id, snapshot_date, opening_stock, quantity_received, quantity_used,
                closing_stock, stockout_flag
            )
            VALUES ($1, $2, $3, $4, $5,
                    GREATEST(0, $3 + $4 - $5),
                    ($3 + $4 - $5) <= 0)
            ON CONFLICT (drug_id, snapshot_date) DO UPDATE SET
                quantity_received = inventory_snapshots.quantity_received + EXCLUDED.quantity_received,
                quantity_used = inventory_snapshots.quantity_used + EXCLUDED.quantity_used,
                closing_stock = GREATEST(0, inventory_snapshots.opening_stock
                    + inventory_snapshots.quantity_received + EXCLUDED.quantity_received
                    - inventory_snapshots.quantity_used - EXCLUDED.quantity_used),
                stockout_flag = (inventory_snapshots.opening_stock
                    + inventory_snapshots.quantity_received + EXCLUDED.quantity_received
                    - inventory_snapshots.quantity_used - EXCLUDED.quantity_used) <= 0,
                updated_at = NOW()
            RETURNING drug_id, snapshot_date, opening_stock, quantity_received, quantity_used,
                      closing_stock, stockout_flag, created_at, updated_at
            "#,
        )
        .bind(input.drug_id)
        .bind(snapshot_date)
        .bind(opening_stock)
        .bind(input.quantity_received)
        .bind(input.quantity_used)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Latest snapshot for a drug, if any
    pub async fn latest_snapshot(&self, drug_id: i32) -> AppResult<Option<InventorySnapshot>> {
        self.ensure_drug_exists(drug_id).await?;

        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT drug_id, snapshot_date, opening_stock, quantity_received, quantity_used,
                   closing_stock, stockout_flag, created_at, updated_at
            FROM inventory_snapshots
            WHERE drug_id = $1
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(drug_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Authoritative current stock: closing stock of the latest snapshot,
    /// zero when no snapshot exists yet
    pub async fn current_stock(&self, drug_id: i32) -> AppResult<i64> {
        let stock = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT closing_stock
            FROM inventory_snapshots
            WHERE drug_id = $1
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(drug_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(stock.unwrap_or(0) as i64)
    }

    /// Trailing usage quantities for the statistical fallback, newest first
    pub async fn usage_window(&self, drug_id: i32, days: u32) -> AppResult<Vec<f64>> {
        let usage = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT quantity_used
            FROM inventory_snapshots
            WHERE drug_id = $1
              AND snapshot_date >= CURRENT_DATE - $2::int
            ORDER BY snapshot_date DESC
            LIMIT $2
            "#,
        )
        .bind(drug_id)
        .bind(days as i32)
        .fetch_all(&self.db)
        .await?;

        Ok(usage.into_iter().map(|q| q as f64).collect())
    }

    async fn ensure_drug_exists(&self, drug_id: i32) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM drugs WHERE id = $1)")
                .bind(drug_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Drug".to_string()));
        }
        Ok(())
    }

    async fn closing_stock_before(&self, drug_id: i32, date: NaiveDate) -> AppResult<i32> {
        let stock = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT closing_stock
            FROM inventory_snapshots
            WHERE drug_id = $1 AND snapshot_date < $2
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(drug_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(stock.unwrap_or(0))
    }
}
