//! Demand statistics tests
//!
//! Covers the forecast-derived profile, the historical fallback, the
//! conservative default, and the numeric floor invariant that keeps every
//! downstream ratio finite.

use proptest::prelude::*;

use shared::{
    compute_reorder_policy, CalculationMethod, DemandError, DemandProfile, DEMAND_FLOOR,
    MIN_HISTORY_DAYS,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Forecast mean divides by the horizon, std-dev is the population form
    #[test]
    fn test_forecast_profile_statistics() {
        let series = [8.0, 12.0, 10.0, 9.0, 11.0, 10.0, 10.0];
        let profile = DemandProfile::from_forecast(&series, 7);

        assert!((profile.avg_daily_demand - 10.0).abs() < 1e-9);
        // variance = (4 + 4 + 0 + 1 + 1 + 0 + 0) / 7
        let expected_std = (10.0f64 / 7.0).sqrt();
        assert!((profile.std_dev - expected_std).abs() < 1e-9);
        assert_eq!(profile.method, CalculationMethod::MlForecast);
    }

    /// A short series is low demand, not inflated demand
    #[test]
    fn test_short_series_divides_by_horizon() {
        let profile = DemandProfile::from_forecast(&[14.0, 14.0], 7);
        assert!((profile.avg_daily_demand - 4.0).abs() < 1e-9);
    }

    /// Numeric floor: zero demand clamps to the strictly positive minimum
    #[test]
    fn test_zero_demand_floor() {
        let profile = DemandProfile::from_forecast(&[0.0; 7], 7);
        assert_eq!(profile.avg_daily_demand, DEMAND_FLOOR);
        assert_eq!(profile.std_dev, DEMAND_FLOOR);
    }

    /// No downstream division produces Infinity or NaN
    #[test]
    fn test_no_infinite_ratios_downstream() {
        let floored = DemandProfile::from_forecast(&[0.0; 7], 7);
        let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let policy = compute_reorder_policy(1_000_000, &floored, 7, 0.95, today);

        assert!(policy.stock_sufficiency_days <= 9_999);
        assert!(policy.traditional_level >= 1);
        assert!(policy.intelligent_level >= 1);
    }

    /// Fallback statistics come from the usage window
    #[test]
    fn test_history_fallback() {
        let usage = [20.0, 25.0, 30.0, 25.0, 20.0, 30.0, 25.0];
        let profile = DemandProfile::from_history(&usage).unwrap();

        assert!((profile.avg_daily_demand - 25.0).abs() < 1e-9);
        assert_eq!(profile.method, CalculationMethod::Statistical);
        assert!(profile.confidence < CalculationMethod::MlForecast.confidence());
    }

    /// Too little history is an explicit error, not a silent guess
    #[test]
    fn test_insufficient_history() {
        let err = DemandProfile::from_history(&[12.0]).unwrap_err();
        assert!(matches!(
            err,
            DemandError::InsufficientHistory {
                available: 1,
                required: MIN_HISTORY_DAYS
            }
        ));
    }

    /// The conservative default is flagged with low confidence
    #[test]
    fn test_conservative_default() {
        let profile = DemandProfile::conservative_default();
        assert_eq!(profile.avg_daily_demand, 30.0);
        assert_eq!(profile.std_dev, 5.0);
        assert_eq!(profile.method, CalculationMethod::Default);
        assert_eq!(profile.confidence, CalculationMethod::Default.confidence());
    }

    /// A constant series has no variability beyond the floor
    #[test]
    fn test_constant_series_std_dev() {
        let profile = DemandProfile::from_forecast(&[10.0; 7], 7);
        assert_eq!(profile.std_dev, DEMAND_FLOOR);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn series_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec((0u32..=10_000).prop_map(|n| n as f64 / 10.0), 1..=14)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Every profile respects the floor and stays finite
        #[test]
        fn prop_forecast_profile_floored(series in series_strategy()) {
            let profile = DemandProfile::from_forecast(&series, 7);

            prop_assert!(profile.avg_daily_demand >= DEMAND_FLOOR);
            prop_assert!(profile.std_dev >= DEMAND_FLOOR);
            prop_assert!(profile.avg_daily_demand.is_finite());
            prop_assert!(profile.std_dev.is_finite());
        }

        /// History profiles respect the floor whenever enough days exist
        #[test]
        fn prop_history_profile_floored(
            usage in prop::collection::vec((0u32..=10_000).prop_map(|n| n as f64 / 10.0), 3..=14)
        ) {
            let profile = DemandProfile::from_history(&usage).unwrap();

            prop_assert!(profile.avg_daily_demand >= DEMAND_FLOOR);
            prop_assert!(profile.std_dev >= DEMAND_FLOOR);
        }

        /// When the series covers at most the horizon, the mean never
        /// exceeds the series maximum
        #[test]
        fn prop_mean_bounded_by_series_max(
            series in prop::collection::vec((0u32..=10_000).prop_map(|n| n as f64 / 10.0), 1..=7)
        ) {
            let profile = DemandProfile::from_forecast(&series, 7);
            let max = series.iter().cloned().fold(0.0f64, f64::max);

            prop_assert!(profile.avg_daily_demand <= max.max(DEMAND_FLOOR) + 1e-9);
        }
    }
}
