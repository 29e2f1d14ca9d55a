//! Reorder policy engine service
//!
//! Orchestrates the per-drug pipeline: demand profile resolution (forecast,
//! statistical fallback, conservative default), the pure policy computation,
//! persistence of the audit row and drug levels, activity logging, and the
//! alert generation driven by the fresh policy output.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::forecast::{match_forecasts, DrugForecast, ForecastClient};
use crate::services::activity::ActivityLogService;
use crate::services::alerts::{AlertService, DrugSummary};
use crate::services::inventory::InventoryService;
use shared::{
    compute_reorder_policy, CalculationMethod, DemandProfile, Drug, RecommendationTier,
    ReorderCalculation, ReorderPolicy,
};

/// Policy engine tunables, sourced from configuration
#[derive(Debug, Clone)]
pub struct ReorderSettings {
    pub default_lead_time_days: u32,
    pub service_level: f64,
    pub historical_window_days: u32,
    pub forecast_horizon_days: u32,
}

impl ReorderSettings {
    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            default_lead_time_days: config.reorder.default_lead_time_days,
            service_level: config.reorder.service_level,
            historical_window_days: config.reorder.historical_window_days,
            forecast_horizon_days: config.forecast.horizon_days,
        }
    }
}

/// Reorder policy engine
#[derive(Clone)]
pub struct ReorderService {
    db: PgPool,
    forecast: ForecastClient,
    settings: ReorderSettings,
    inventory: InventoryService,
    alerts: AlertService,
    activity: ActivityLogService,
}

/// One drug's failure inside a batch run
#[derive(Debug, Serialize)]
pub struct BatchError {
    pub drug_id: i32,
    pub drug_name: String,
    pub reason: String,
}

/// Aggregated outcome of a batch recalculation
///
/// A single drug's failure never aborts the batch; only a total inability to
/// reach the database does.
#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    pub succeeded: u32,
    pub failed: u32,
    /// Drugs computed from usage statistics because no forecast matched
    pub without_forecast: u32,
    pub errors: Vec<BatchError>,
}

/// Database row for a drug
#[derive(Debug, FromRow)]
struct DrugRow {
    id: i32,
    name: String,
    generic_name: Option<String>,
    unit: String,
    supplier: Option<String>,
    lead_time_days: Option<i32>,
    reorder_level: i32,
    reorder_quantity: i32,
    calculated_reorder_level: Option<i32>,
    last_reorder_calculation: Option<DateTime<Utc>>,
    reorder_calculation_confidence: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DrugRow> for Drug {
    fn from(row: DrugRow) -> Self {
        Drug {
            id: row.id,
            name: row.name,
            generic_name: row.generic_name,
            unit: row.unit,
            supplier: row.supplier,
            lead_time_days: row.lead_time_days,
            reorder_level: row.reorder_level,
            reorder_quantity: row.reorder_quantity,
            calculated_reorder_level: row.calculated_reorder_level,
            last_reorder_calculation: row.last_reorder_calculation,
            reorder_calculation_confidence: row.reorder_calculation_confidence,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a reorder calculation
#[derive(Debug, FromRow)]
struct CalculationRow {
    id: Uuid,
    drug_id: i32,
    avg_daily_demand: f64,
    demand_std_dev: f64,
    lead_time_days: i32,
    confidence_level: f64,
    calculation_method: String,
    safety_stock: i32,
    calculated_level: i32,
    intelligent_reorder_level: i32,
    stock_sufficiency_days: i32,
    recommendation_tier: String,
    days_until_reorder: i32,
    reorder_date: NaiveDate,
    reorder_recommendation: String,
    prevent_overstocking_note: Option<String>,
    calculation_date: DateTime<Utc>,
}

impl From<CalculationRow> for ReorderCalculation {
    fn from(row: CalculationRow) -> Self {
        ReorderCalculation {
            id: row.id,
            drug_id: row.drug_id,
            avg_daily_demand: row.avg_daily_demand,
            demand_std_dev: row.demand_std_dev,
            lead_time_days: row.lead_time_days,
            confidence_level: row.confidence_level,
            calculation_method: CalculationMethod::parse(&row.calculation_method),
            safety_stock: row.safety_stock,
            calculated_level: row.calculated_level,
            intelligent_reorder_level: row.intelligent_reorder_level,
            stock_sufficiency_days: row.stock_sufficiency_days,
            recommendation_tier: RecommendationTier::parse(&row.recommendation_tier),
            days_until_reorder: row.days_until_reorder,
            reorder_date: row.reorder_date,
            reorder_recommendation: row.reorder_recommendation,
            prevent_overstocking_note: row.prevent_overstocking_note,
            calculation_date: row.calculation_date,
        }
    }
}

impl ReorderService {
    /// Create a new ReorderService instance
    pub fn new(db: PgPool, forecast: ForecastClient, settings: ReorderSettings) -> Self {
        Self {
            inventory: InventoryService::new(db.clone()),
            alerts: AlertService::new(db.clone()),
            activity: ActivityLogService::new(db.clone()),
            db,
            forecast,
            settings,
        }
    }

    /// Recompute the reorder policy for every drug
    ///
    /// One batch forecast call feeds all drugs; if it fails, every drug takes
    /// the statistical fallback. Per-drug errors are collected, not fatal.
    pub async fn recalculate_all(&self) -> AppResult<BatchResult> {
        let drugs = self.fetch_drugs().await?;
        let forecasts = match self
            .forecast
            .get_all_forecasts(self.settings.forecast_horizon_days)
            .await
        {
            Ok(forecasts) => forecasts,
            Err(AppError::ForecastUnavailable(reason)) => {
                tracing::warn!(
                    %reason,
                    "forecast service unavailable; statistical fallback for all drugs"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let matched = match_forecasts(&drugs, &forecasts);
        let mut result = BatchResult {
            without_forecast: (drugs.len() - matched.len()) as u32,
            ..Default::default()
        };
        if !forecasts.is_empty() && result.without_forecast > 0 {
            tracing::info!(
                unmatched = result.without_forecast,
                "drugs without a matching forecast use usage statistics"
            );
        }

        for drug in &drugs {
            match self
                .recalculate_one(drug, matched.get(&drug.id).copied())
                .await
            {
                Ok(calculation) => {
                    result.succeeded += 1;
                    tracing::debug!(
                        drug_id = drug.id,
                        tier = %calculation.recommendation_tier,
                        intelligent_level = calculation.intelligent_reorder_level,
                        "reorder policy updated"
                    );
                }
                Err(e) => {
                    tracing::error!(drug_id = drug.id, error = %e, "reorder recalculation failed");
                    result.failed += 1;
                    result.errors.push(BatchError {
                        drug_id: drug.id,
                        drug_name: drug.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Sweep stale alerts now that every drug's level is fresh
        self.alerts.resolve_outdated_alerts().await?;

        Ok(result)
    }

    /// Recompute the reorder policy for one drug
    pub async fn recalculate_drug(&self, drug_id: i32) -> AppResult<ReorderCalculation> {
        let drug = self.fetch_drug(drug_id).await?;
        let forecast = match self
            .forecast
            .get_forecast(drug_id, self.settings.forecast_horizon_days)
            .await
        {
            Ok(forecast) => Some(forecast),
            Err(AppError::ForecastUnavailable(reason)) => {
                tracing::warn!(drug_id, %reason, "forecast unavailable; statistical fallback");
                None
            }
            Err(e) => return Err(e),
        };

        self.recalculate_one(&drug, forecast.as_ref()).await
    }

    /// Calculation history for a drug, latest first
    pub async fn get_calculations(
        &self,
        drug_id: i32,
        limit: i64,
    ) -> AppResult<Vec<ReorderCalculation>> {
        self.fetch_drug(drug_id).await?;

        let rows = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, drug_id, avg_daily_demand, demand_std_dev, lead_time_days,
                   confidence_level, calculation_method, safety_stock, calculated_level,
                   intelligent_reorder_level, stock_sufficiency_days, recommendation_tier,
                   days_until_reorder, reorder_date, reorder_recommendation,
                   prevent_overstocking_note, calculation_date
            FROM reorder_calculations
            WHERE drug_id = $1
            ORDER BY calculation_date DESC
            LIMIT $2
            "#,
        )
        .bind(drug_id)
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Copy the latest intelligent level into the drug's manual reorder level
    ///
    /// Explicit user acceptance of a recommendation, re-syncing the trigger
    /// point after a manual override.
    pub async fn accept_recommendation(&self, drug_id: i32) -> AppResult<Drug> {
        let drug = self.fetch_drug(drug_id).await?;
        let latest = self
            .get_calculations(drug_id, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Reorder calculation".to_string()))?;

        let row = sqlx::query_as::<_, DrugRow>(
            r#"
            UPDATE drugs
            SET reorder_level = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, name, generic_name, unit, supplier, lead_time_days,
                      reorder_level, reorder_quantity, calculated_reorder_level,
                      last_reorder_calculation, reorder_calculation_confidence,
                      created_at, updated_at
            "#,
        )
        .bind(latest.intelligent_reorder_level)
        .bind(drug_id)
        .fetch_one(&self.db)
        .await?;

        self.activity
            .record(
                "recommendation_accepted",
                Some(drug_id),
                serde_json::json!({
                    "calculation_id": latest.id,
                    "previous_level": drug.reorder_level,
                    "accepted_level": latest.intelligent_reorder_level,
                }),
            )
            .await;

        Ok(row.into())
    }

    // ========================================================================
    // Pipeline Internals
    // ========================================================================

    /// Forecast → statistics → policy → persistence → alerts, for one drug
    async fn recalculate_one(
        &self,
        drug: &Drug,
        forecast: Option<&DrugForecast>,
    ) -> AppResult<ReorderCalculation> {
        let (profile, total_predicted) = match forecast {
            Some(f) => (
                DemandProfile::from_forecast(&f.series(), self.settings.forecast_horizon_days),
                Some(f.total_predicted_7_days),
            ),
            None => (self.fallback_profile(drug.id).await?, None),
        };

        let current_stock = self.inventory.current_stock(drug.id).await?;
        let lead_time_days = drug
            .lead_time_days
            .map(|d| d as u32)
            .unwrap_or(self.settings.default_lead_time_days);
        let today = Utc::now().date_naive();

        let policy = compute_reorder_policy(
            current_stock,
            &profile,
            lead_time_days,
            self.settings.service_level,
            today,
        );

        let calculation = self
            .persist_calculation(drug, &profile, &policy, lead_time_days)
            .await?;

        // Alerts are driven by the freshly computed trigger level, not the
        // level the drug row carried before this run.
        let summary = DrugSummary {
            id: drug.id,
            name: drug.name.clone(),
            unit: drug.unit.clone(),
            reorder_quantity: drug.reorder_quantity,
        };
        self.alerts
            .generate_low_stock_alert(&summary, current_stock, policy.intelligent_level)
            .await?;
        if let Some(total) = total_predicted {
            self.alerts
                .generate_predicted_stockout_alert(&summary, current_stock, total)
                .await?;
        }

        Ok(calculation)
    }

    /// Statistical fallback profile from the trailing usage window, dropping
    /// to the conservative default when history is too thin
    async fn fallback_profile(&self, drug_id: i32) -> AppResult<DemandProfile> {
        let usage = self
            .inventory
            .usage_window(drug_id, self.settings.historical_window_days)
            .await?;

        match DemandProfile::from_history(&usage) {
            Ok(profile) => Ok(profile),
            Err(e) => {
                tracing::warn!(drug_id, error = %e, "using conservative default demand profile");
                Ok(DemandProfile::conservative_default())
            }
        }
    }

    /// Apply one computation in the fixed order audit-row, drug-update, log
    async fn persist_calculation(
        &self,
        drug: &Drug,
        profile: &DemandProfile,
        policy: &ReorderPolicy,
        lead_time_days: u32,
    ) -> AppResult<ReorderCalculation> {
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            INSERT INTO reorder_calculations (
                drug_id, avg_daily_demand, demand_std_dev, lead_time_days,
                confidence_level, calculation_method, safety_stock, calculated_level,
                intelligent_reorder_level, stock_sufficiency_days, recommendation_tier,
                days_until_reorder, reorder_date, reorder_recommendation,
                prevent_overstocking_note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, drug_id, avg_daily_demand, demand_std_dev, lead_time_days,
                      confidence_level, calculation_method, safety_stock, calculated_level,
                      intelligent_reorder_level, stock_sufficiency_days, recommendation_tier,
                      days_until_reorder, reorder_date, reorder_recommendation,
                      prevent_overstocking_note, calculation_date
            "#,
        )
        .bind(drug.id)
        .bind(profile.avg_daily_demand)
        .bind(profile.std_dev)
        .bind(lead_time_days as i32)
        .bind(self.settings.service_level)
        .bind(profile.method.as_str())
        .bind(policy.safety_stock as i32)
        .bind(policy.traditional_level as i32)
        .bind(policy.intelligent_level as i32)
        .bind(policy.stock_sufficiency_days as i32)
        .bind(policy.tier.as_str())
        .bind(policy.days_until_reorder as i32)
        .bind(policy.reorder_date)
        .bind(&policy.recommendation)
        .bind(&policy.overstock_note)
        .fetch_one(&self.db)
        .await?;

        sqlx::query(
            r#"
            UPDATE drugs
            SET reorder_level = $1, calculated_reorder_level = $2,
                last_reorder_calculation = NOW(), reorder_calculation_confidence = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(policy.intelligent_level as i32)
        .bind(policy.traditional_level as i32)
        .bind(profile.confidence)
        .bind(drug.id)
        .execute(&self.db)
        .await?;

        self.activity
            .record(
                "reorder_calculation",
                Some(drug.id),
                serde_json::json!({
                    "calculation_id": row.id,
                    "method": profile.method.as_str(),
                    "avg_daily_demand": profile.avg_daily_demand,
                    "demand_std_dev": profile.std_dev,
                    "tier": policy.tier.as_str(),
                    "safety_stock": policy.safety_stock,
                    "traditional_level": policy.traditional_level,
                    "intelligent_level": policy.intelligent_level,
                }),
            )
            .await;

        if drug.reorder_level as i64 != policy.intelligent_level {
            self.activity
                .record(
                    "reorder_level_change",
                    Some(drug.id),
                    serde_json::json!({
                        "previous_level": drug.reorder_level,
                        "new_level": policy.intelligent_level,
                    }),
                )
                .await;
        }

        Ok(row.into())
    }

    async fn fetch_drug(&self, drug_id: i32) -> AppResult<Drug> {
        let row = sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT id, name, generic_name, unit, supplier, lead_time_days,
                   reorder_level, reorder_quantity, calculated_reorder_level,
                   last_reorder_calculation, reorder_calculation_confidence,
                   created_at, updated_at
            FROM drugs
            WHERE id = $1
            "#,
        )
        .bind(drug_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Drug".to_string()))?;

        Ok(row.into())
    }

    async fn fetch_drugs(&self) -> AppResult<Vec<Drug>> {
        let rows = sqlx::query_as::<_, DrugRow>(
            r#"
            SELECT id, name, generic_name, unit, supplier, lead_time_days,
                   reorder_level, reorder_quantity, calculated_reorder_level,
                   last_reorder_calculation, reorder_calculation_confidence,
                   created_at, updated_at
            FROM drugs
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
