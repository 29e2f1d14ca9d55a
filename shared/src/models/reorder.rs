//! Reorder policy computation
//!
//! Pure safety-stock arithmetic and the tiered replenishment decision. The
//! backend service layer wraps this with forecast resolution and persistence.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::demand::{CalculationMethod, DemandProfile};

/// Persisted levels are confined to this range regardless of what the
/// demand inputs produce
pub const MAX_LEVEL: i64 = 999_999;

/// Upper bound on the stock-sufficiency horizon in days
pub const MAX_SUFFICIENCY_DAYS: i64 = 9_999;

/// Reorder-urgency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    Immediate,
    Upcoming,
    Sufficient,
    Overstocked,
}

impl RecommendationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationTier::Immediate => "immediate",
            RecommendationTier::Upcoming => "upcoming",
            RecommendationTier::Sufficient => "sufficient",
            RecommendationTier::Overstocked => "overstocked",
        }
    }

    /// Parse a stored tier tag, treating unknown tags as `Immediate` so a
    /// corrupted row errs on the side of urgency
    pub fn parse(s: &str) -> Self {
        match s {
            "upcoming" => RecommendationTier::Upcoming,
            "sufficient" => RecommendationTier::Sufficient,
            "overstocked" => RecommendationTier::Overstocked,
            _ => RecommendationTier::Immediate,
        }
    }
}

impl std::fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one reorder policy computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderPolicy {
    pub safety_stock: i64,
    /// Undamped statistical level, kept for audit
    pub traditional_level: i64,
    /// Tier-dampened level used as the operational trigger
    pub intelligent_level: i64,
    pub stock_sufficiency_days: i64,
    pub tier: RecommendationTier,
    pub days_until_reorder: i64,
    pub reorder_date: NaiveDate,
    pub recommendation: String,
    pub overstock_note: Option<String>,
}

/// Immutable audit row for one computation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderCalculation {
    pub id: Uuid,
    pub drug_id: i32,
    pub avg_daily_demand: f64,
    pub demand_std_dev: f64,
    pub lead_time_days: i32,
    pub confidence_level: f64,
    pub calculation_method: CalculationMethod,
    pub safety_stock: i32,
    pub calculated_level: i32,
    pub intelligent_reorder_level: i32,
    pub stock_sufficiency_days: i32,
    pub recommendation_tier: RecommendationTier,
    pub days_until_reorder: i32,
    pub reorder_date: NaiveDate,
    pub reorder_recommendation: String,
    pub prevent_overstocking_note: Option<String>,
    pub calculation_date: DateTime<Utc>,
}

/// Standard-normal quantile for the supported service levels
pub fn z_score(service_level: f64) -> f64 {
    if service_level >= 0.99 {
        2.58
    } else {
        1.96
    }
}

/// Compute the full reorder policy for one drug
///
/// Deterministic: identical inputs always produce identical output.
pub fn compute_reorder_policy(
    current_stock: i64,
    profile: &DemandProfile,
    lead_time_days: u32,
    service_level: f64,
    today: NaiveDate,
) -> ReorderPolicy {
    let lead = lead_time_days as f64;
    let z = z_score(service_level);

    let safety_stock = clamp_level((z * lead.sqrt() * profile.std_dev).ceil(), 0, MAX_LEVEL);
    let traditional_level = clamp_level(
        (profile.avg_daily_demand * lead + safety_stock as f64).ceil(),
        1,
        MAX_LEVEL,
    );

    // Runway at the estimated demand rate. avg_daily_demand is floored
    // strictly above zero, so the ratio is always finite.
    let sufficiency = clamp_level(
        (current_stock as f64 / profile.avg_daily_demand).floor(),
        0,
        MAX_SUFFICIENCY_DAYS,
    );

    let lead_days = lead_time_days as i64;
    let (tier, days_until_reorder, intelligent_raw) = if sufficiency <= lead_days {
        (RecommendationTier::Immediate, 0, traditional_level as f64)
    } else if sufficiency <= lead_days + 7 {
        (
            RecommendationTier::Upcoming,
            (sufficiency - lead_days - 2).clamp(1, 30),
            traditional_level as f64,
        )
    } else if sufficiency <= lead_days + 21 {
        (
            RecommendationTier::Sufficient,
            (sufficiency - lead_days - 3).clamp(7, 60),
            (traditional_level as f64 * 0.8).ceil(),
        )
    } else {
        (
            RecommendationTier::Overstocked,
            (sufficiency - lead_days - 7).clamp(21, 365),
            (traditional_level as f64 * 0.5).ceil(),
        )
    };

    let intelligent_level = clamp_level(intelligent_raw, 1, MAX_LEVEL);
    let days_until_reorder = days_until_reorder.clamp(-1, MAX_SUFFICIENCY_DAYS);
    let reorder_date = today + Duration::days(days_until_reorder);

    let recommendation = match tier {
        RecommendationTier::Immediate => format!(
            "Stock covers {} days, within the {}-day lead time. Reorder today.",
            sufficiency, lead_days
        ),
        RecommendationTier::Upcoming => format!(
            "Stock lasts {} days. Reorder within {} days (by {}).",
            sufficiency, days_until_reorder, reorder_date
        ),
        RecommendationTier::Sufficient => format!(
            "Stock lasts {} days. Plan to reorder around {}.",
            sufficiency, reorder_date
        ),
        RecommendationTier::Overstocked => format!(
            "Stock lasts {} days. Hold off reordering until {}.",
            sufficiency, reorder_date
        ),
    };

    let overstock_note = match tier {
        RecommendationTier::Sufficient => Some(
            "Reorder level reduced to 80% of the statistical estimate to limit excess stock."
                .to_string(),
        ),
        RecommendationTier::Overstocked => Some(
            "Reorder level reduced to 50% of the statistical estimate to limit excess stock."
                .to_string(),
        ),
        _ => None,
    };

    ReorderPolicy {
        safety_stock,
        traditional_level,
        intelligent_level,
        stock_sufficiency_days: sufficiency,
        tier,
        days_until_reorder,
        reorder_date,
        recommendation,
        overstock_note,
    }
}

/// Clamp a possibly pathological float into an integer range. NaN collapses
/// to the minimum, infinities to the nearest bound.
fn clamp_level(value: f64, min: i64, max: i64) -> i64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min as f64, max as f64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(avg: f64, std_dev: f64) -> DemandProfile {
        DemandProfile {
            avg_daily_demand: avg,
            std_dev,
            method: CalculationMethod::MlForecast,
            confidence: 0.9,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn textbook_safety_stock() {
        // z=1.96, sqrt(7)*3 = 7.937..., ceil(15.56) = 16, ceil(70+16) = 86
        let policy = compute_reorder_policy(500, &profile(10.0, 3.0), 7, 0.95, day(2025, 3, 1));
        assert_eq!(policy.safety_stock, 16);
        assert_eq!(policy.traditional_level, 86);
    }

    #[test]
    fn higher_service_level_uses_wider_quantile() {
        assert_eq!(z_score(0.95), 1.96);
        assert_eq!(z_score(0.99), 2.58);
    }

    #[test]
    fn nan_collapses_to_minimum() {
        assert_eq!(clamp_level(f64::NAN, 1, MAX_LEVEL), 1);
        assert_eq!(clamp_level(f64::INFINITY, 1, MAX_LEVEL), MAX_LEVEL);
        assert_eq!(clamp_level(f64::NEG_INFINITY, 0, MAX_LEVEL), 0);
    }

    #[test]
    fn immediate_tier_reorders_today() {
        let today = day(2025, 3, 1);
        // 70 units at 10/day = 7 days, equal to the lead time
        let policy = compute_reorder_policy(70, &profile(10.0, 3.0), 7, 0.95, today);
        assert_eq!(policy.tier, RecommendationTier::Immediate);
        assert_eq!(policy.days_until_reorder, 0);
        assert_eq!(policy.reorder_date, today);
        assert_eq!(policy.intelligent_level, policy.traditional_level);
    }

    #[test]
    fn overstocked_tier_halves_the_level() {
        // 3000 units at 10/day = 300 days of runway
        let policy = compute_reorder_policy(3000, &profile(10.0, 3.0), 7, 0.95, day(2025, 3, 1));
        assert_eq!(policy.tier, RecommendationTier::Overstocked);
        assert_eq!(
            policy.intelligent_level,
            ((policy.traditional_level as f64) * 0.5).ceil() as i64
        );
        assert!(policy.overstock_note.is_some());
    }
}
