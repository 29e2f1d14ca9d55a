//! Alert engine
//!
//! Opens, deduplicates, and auto-resolves low-stock and predicted-stockout
//! alerts, and applies the user-driven acknowledge/dismiss transitions.
//!
//! The at-most-one-active-alert-per-(drug, type) invariant is enforced twice:
//! a read-before-write existence check keeps the common path cheap, and a
//! partial unique index on the alerts table arbitrates the race two
//! concurrent writers would otherwise lose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity::ActivityLogService;
use shared::{
    days_of_stock, is_valid_transition, low_stock_severity, predicted_stockout_severity, Alert,
    AlertHistoryEntry, AlertSeverity, AlertStatus, AlertType, STOCKOUT_WARNING_DAYS,
};

/// Alert lifecycle service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    activity: ActivityLogService,
}

/// The drug facts the alert generators need
#[derive(Debug, Clone, FromRow)]
pub struct DrugSummary {
    pub id: i32,
    pub name: String,
    pub unit: String,
    pub reorder_quantity: i32,
}

/// Input for user-driven alert transitions
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AlertActionInput {
    #[validate(length(min = 1, max = 100))]
    pub performed_by: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Filter for listing alerts
#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    pub status: Option<String>,
    pub alert_type: Option<String>,
    pub drug_id: Option<i32>,
    pub limit: Option<i64>,
}

/// Result of one generation + auto-resolve sweep
#[derive(Debug, Default, Serialize)]
pub struct AlertSweepSummary {
    pub created: u32,
    pub resolved: u32,
}

/// Database row for an alert
#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    drug_id: i32,
    alert_type: String,
    severity: String,
    status: String,
    title: String,
    message: String,
    threshold: f64,
    current_value: f64,
    recommended_action: Option<String>,
    is_read: bool,
    acknowledged_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        // Column CHECK constraints guarantee the tags parse; the fallbacks
        // keep a corrupted row visible instead of panicking.
        Alert {
            id: row.id,
            drug_id: row.drug_id,
            alert_type: AlertType::parse(&row.alert_type).unwrap_or(AlertType::LowStock),
            severity: AlertSeverity::parse(&row.severity).unwrap_or(AlertSeverity::Medium),
            status: AlertStatus::parse(&row.status).unwrap_or(AlertStatus::Active),
            title: row.title,
            message: row.message,
            threshold: row.threshold,
            current_value: row.current_value,
            recommended_action: row.recommended_action,
            is_read: row.is_read,
            acknowledged_at: row.acknowledged_at,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a history entry
#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    alert_id: Uuid,
    action: String,
    performed_by: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for AlertHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        AlertHistoryEntry {
            id: row.id,
            alert_id: row.alert_id,
            action: row.action,
            performed_by: row.performed_by,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Row for the auto-resolve candidate query
#[derive(Debug, FromRow)]
struct ResolveCandidateRow {
    id: Uuid,
    drug_id: i32,
    alert_type: String,
    current_stock: i64,
    reorder_level: i32,
    avg_daily_demand: Option<f64>,
}

/// Row for the low-stock sweep query
#[derive(Debug, FromRow)]
struct SweepRow {
    id: i32,
    name: String,
    unit: String,
    reorder_quantity: i32,
    reorder_level: i32,
    current_stock: i64,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            activity: ActivityLogService::new(db.clone()),
            db,
        }
    }

    // ========================================================================
    // Alert Generation
    // ========================================================================

    /// Open a low-stock alert when stock is at or below the reorder level
    ///
    /// Returns `None` when the condition does not hold or an active alert of
    /// this type already exists for the drug.
    pub async fn generate_low_stock_alert(
        &self,
        drug: &DrugSummary,
        current_stock: i64,
        reorder_level: i64,
    ) -> AppResult<Option<Alert>> {
        if current_stock > reorder_level {
            return Ok(None);
        }
        if self.has_active_alert(drug.id, AlertType::LowStock).await? {
            return Ok(None);
        }

        let severity = low_stock_severity(current_stock, reorder_level);
        let title = format!("Low stock: {}", drug.name);
        let message = format!(
            "{} has {} {} on hand, at or below the reorder level of {}.",
            drug.name, current_stock, drug.unit, reorder_level
        );
        let recommended_action = format!(
            "Reorder at least {} {} immediately.",
            drug.reorder_quantity, drug.unit
        );

        self.insert_alert(
            drug.id,
            AlertType::LowStock,
            severity,
            &title,
            &message,
            reorder_level as f64,
            current_stock as f64,
            Some(&recommended_action),
        )
        .await
    }

    /// Open a predicted-stockout alert when forecast demand exhausts stock
    /// within the warning window
    pub async fn generate_predicted_stockout_alert(
        &self,
        drug: &DrugSummary,
        current_stock: i64,
        total_predicted_7_days: f64,
    ) -> AppResult<Option<Alert>> {
        let days = days_of_stock(current_stock, total_predicted_7_days);
        if days <= 0.0 || days > STOCKOUT_WARNING_DAYS {
            return Ok(None);
        }
        if self
            .has_active_alert(drug.id, AlertType::PredictedStockout)
            .await?
        {
            return Ok(None);
        }

        let severity = predicted_stockout_severity(days);
        let title = format!("Predicted stockout: {}", drug.name);
        let message = format!(
            "Forecast demand suggests {} will run out in about {:.1} days ({} {} on hand).",
            drug.name, days, current_stock, drug.unit
        );
        let recommended_action = format!(
            "Reorder at least {} {} before stock runs out.",
            drug.reorder_quantity, drug.unit
        );

        self.insert_alert(
            drug.id,
            AlertType::PredictedStockout,
            severity,
            &title,
            &message,
            STOCKOUT_WARNING_DAYS,
            days,
            Some(&recommended_action),
        )
        .await
    }

    /// Resolve every active alert whose condition no longer holds
    ///
    /// Low-stock alerts clear once stock exceeds the drug's current reorder
    /// level. Predicted-stockout alerts clear once the runway implied by the
    /// latest calculated demand rate exceeds the warning window; alerts for
    /// drugs with no calculation yet are left untouched.
    pub async fn resolve_outdated_alerts(&self) -> AppResult<u32> {
        let candidates = sqlx::query_as::<_, ResolveCandidateRow>(
            r#"
            SELECT a.id, a.drug_id, a.alert_type,
                   COALESCE(s.closing_stock, 0)::int8 AS current_stock,
                   d.reorder_level,
                   c.avg_daily_demand
            FROM alerts a
            JOIN drugs d ON d.id = a.drug_id
            LEFT JOIN LATERAL (
                SELECT closing_stock FROM inventory_snapshots
                WHERE drug_id = a.drug_id
                ORDER BY snapshot_date DESC
                LIMIT 1
            ) s ON TRUE
            LEFT JOIN LATERAL (
                SELECT avg_daily_demand FROM reorder_calculations
                WHERE drug_id = a.drug_id
                ORDER BY calculation_date DESC
                LIMIT 1
            ) c ON TRUE
            WHERE a.status = 'active'
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut resolved = 0;
        for candidate in candidates {
            let cleared = match AlertType::parse(&candidate.alert_type) {
                Some(AlertType::LowStock) => {
                    candidate.current_stock > candidate.reorder_level as i64
                }
                Some(AlertType::PredictedStockout) => match candidate.avg_daily_demand {
                    Some(avg) if avg > 0.0 => {
                        candidate.current_stock as f64 / avg > STOCKOUT_WARNING_DAYS
                    }
                    _ => false,
                },
                None => false,
            };

            if !cleared {
                continue;
            }

            let updated = sqlx::query(
                r#"
                UPDATE alerts
                SET status = 'resolved', resolved_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND status = 'active'
                "#,
            )
            .bind(candidate.id)
            .execute(&self.db)
            .await?;

            if updated.rows_affected() == 0 {
                continue;
            }

            self.append_history(
                candidate.id,
                "auto_resolved",
                Some("system"),
                Some("Triggering condition no longer holds"),
            )
            .await?;
            self.activity
                .record(
                    "alert_auto_resolved",
                    Some(candidate.drug_id),
                    serde_json::json!({
                        "alert_id": candidate.id,
                        "alert_type": candidate.alert_type,
                        "current_stock": candidate.current_stock,
                    }),
                )
                .await;
            resolved += 1;
        }

        Ok(resolved)
    }

    /// Run low-stock generation across all drugs, then the auto-resolve sweep
    pub async fn check_all(&self) -> AppResult<AlertSweepSummary> {
        let rows = sqlx::query_as::<_, SweepRow>(
            r#"
            SELECT d.id, d.name, d.unit, d.reorder_quantity, d.reorder_level,
                   COALESCE(s.closing_stock, 0)::int8 AS current_stock
            FROM drugs d
            LEFT JOIN LATERAL (
                SELECT closing_stock FROM inventory_snapshots
                WHERE drug_id = d.id
                ORDER BY snapshot_date DESC
                LIMIT 1
            ) s ON TRUE
            ORDER BY d.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut summary = AlertSweepSummary::default();
        for row in rows {
            let drug = DrugSummary {
                id: row.id,
                name: row.name,
                unit: row.unit,
                reorder_quantity: row.reorder_quantity,
            };
            if self
                .generate_low_stock_alert(&drug, row.current_stock, row.reorder_level as i64)
                .await?
                .is_some()
            {
                summary.created += 1;
            }
        }

        summary.resolved = self.resolve_outdated_alerts().await?;
        Ok(summary)
    }

    // ========================================================================
    // User-Driven Transitions
    // ========================================================================

    /// Acknowledge an active alert
    pub async fn acknowledge(&self, alert_id: Uuid, input: AlertActionInput) -> AppResult<Alert> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let alert = self.fetch_alert(alert_id).await?;
        if !is_valid_transition(alert.status, AlertStatus::Acknowledged) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot acknowledge an alert in status '{}'",
                alert.status.as_str()
            )));
        }

        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            UPDATE alerts
            SET status = 'acknowledged', acknowledged_at = NOW(), is_read = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, drug_id, alert_type, severity, status, title, message,
                      threshold, current_value, recommended_action, is_read,
                      acknowledged_at, resolved_at, created_at, updated_at
            "#,
        )
        .bind(alert_id)
        .fetch_one(&self.db)
        .await?;

        self.append_history(
            alert_id,
            "acknowledged",
            input.performed_by.as_deref(),
            input.notes.as_deref(),
        )
        .await?;
        self.activity
            .record(
                "alert_acknowledged",
                Some(alert.drug_id),
                serde_json::json!({ "alert_id": alert_id }),
            )
            .await;

        Ok(row.into())
    }

    /// Dismiss an active alert
    pub async fn dismiss(&self, alert_id: Uuid, input: AlertActionInput) -> AppResult<Alert> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let alert = self.fetch_alert(alert_id).await?;
        if !is_valid_transition(alert.status, AlertStatus::Dismissed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot dismiss an alert in status '{}'",
                alert.status.as_str()
            )));
        }

        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            UPDATE alerts
            SET status = 'dismissed', is_read = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, drug_id, alert_type, severity, status, title, message,
                      threshold, current_value, recommended_action, is_read,
                      acknowledged_at, resolved_at, created_at, updated_at
            "#,
        )
        .bind(alert_id)
        .fetch_one(&self.db)
        .await?;

        self.append_history(
            alert_id,
            "dismissed",
            input.performed_by.as_deref(),
            input.notes.as_deref(),
        )
        .await?;
        self.activity
            .record(
                "alert_dismissed",
                Some(alert.drug_id),
                serde_json::json!({ "alert_id": alert_id }),
            )
            .await;

        Ok(row.into())
    }

    /// Mark an alert as read without changing its status
    pub async fn mark_read(&self, alert_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE alerts SET is_read = TRUE, updated_at = NOW() WHERE id = $1")
                .bind(alert_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// List alerts, optionally filtered by status, type, and drug
    pub async fn list_alerts(&self, filter: AlertFilter) -> AppResult<Vec<Alert>> {
        let status = filter
            .status
            .as_deref()
            .map(|s| {
                AlertStatus::parse(s)
                    .map(|v| v.as_str().to_string())
                    .ok_or_else(|| {
                        AppError::ValidationError(format!("Unknown alert status '{}'", s))
                    })
            })
            .transpose()?;
        let alert_type = filter
            .alert_type
            .as_deref()
            .map(|s| {
                AlertType::parse(s)
                    .map(|v| v.as_str().to_string())
                    .ok_or_else(|| {
                        AppError::ValidationError(format!("Unknown alert type '{}'", s))
                    })
            })
            .transpose()?;
        let limit = filter.limit.unwrap_or(100).clamp(1, 500);

        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, drug_id, alert_type, severity, status, title, message,
                   threshold, current_value, recommended_action, is_read,
                   acknowledged_at, resolved_at, created_at, updated_at
            FROM alerts
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR alert_type = $2)
              AND ($3::int4 IS NULL OR drug_id = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(status)
        .bind(alert_type)
        .bind(filter.drug_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count unread active alerts
    pub async fn unread_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM alerts WHERE is_read = FALSE AND status = 'active'",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Transition history for an alert, oldest first
    pub async fn get_history(&self, alert_id: Uuid) -> AppResult<Vec<AlertHistoryEntry>> {
        // Ensure the alert exists so a bad id is a 404, not an empty list
        self.fetch_alert(alert_id).await?;

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, alert_id, action, performed_by, notes, created_at
            FROM alert_history
            WHERE alert_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(alert_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn has_active_alert(&self, drug_id: i32, alert_type: AlertType) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alerts
                WHERE drug_id = $1 AND alert_type = $2 AND status = 'active'
            )
            "#,
        )
        .bind(drug_id)
        .bind(alert_type.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_alert(
        &self,
        drug_id: i32,
        alert_type: AlertType,
        severity: AlertSeverity,
        title: &str,
        message: &str,
        threshold: f64,
        current_value: f64,
        recommended_action: Option<&str>,
    ) -> AppResult<Option<Alert>> {
        // The partial unique index arbitrates concurrent inserts; a conflict
        // means another writer created the active alert first.
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            INSERT INTO alerts (
                drug_id, alert_type, severity, status, title, message,
                threshold, current_value, recommended_action
            )
            VALUES ($1, $2, $3, 'active', $4, $5, $6, $7, $8)
            ON CONFLICT (drug_id, alert_type) WHERE status = 'active' DO NOTHING
            RETURNING id, drug_id, alert_type, severity, status, title, message,
                      threshold, current_value, recommended_action, is_read,
                      acknowledged_at, resolved_at, created_at, updated_at
            "#,
        )
        .bind(drug_id)
        .bind(alert_type.as_str())
        .bind(severity.as_str())
        .bind(title)
        .bind(message)
        .bind(threshold)
        .bind(current_value)
        .bind(recommended_action)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let alert: Alert = row.into();

        self.append_history(alert.id, "created", Some("system"), None)
            .await?;
        self.activity
            .record(
                "alert_created",
                Some(drug_id),
                serde_json::json!({
                    "alert_id": alert.id,
                    "alert_type": alert_type.as_str(),
                    "severity": severity.as_str(),
                    "threshold": threshold,
                    "current_value": current_value,
                }),
            )
            .await;

        Ok(Some(alert))
    }

    async fn append_history(
        &self,
        alert_id: Uuid,
        action: &str,
        performed_by: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alert_history (alert_id, action, performed_by, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(alert_id)
        .bind(action)
        .bind(performed_by)
        .bind(notes)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn fetch_alert(&self, alert_id: Uuid) -> AppResult<Alert> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, drug_id, alert_type, severity, status, title, message,
                   threshold, current_value, recommended_action, is_read,
                   acknowledged_at, resolved_at, created_at, updated_at
            FROM alerts
            WHERE id = $1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        Ok(row.into())
    }
}
