//! Demand statistics derived from forecasts or usage history

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest admissible demand rate or deviation. Keeps sufficiency-day
/// ratios finite when a forecast collapses to zero.
pub const DEMAND_FLOOR: f64 = 0.1;

/// Minimum usable days of history for the statistical fallback
pub const MIN_HISTORY_DAYS: usize = 3;

/// Conservative defaults applied when neither a forecast nor usable history
/// is available (the same values the forecasting service pads with)
pub const DEFAULT_AVG_DAILY_DEMAND: f64 = 30.0;
pub const DEFAULT_DEMAND_STD_DEV: f64 = 5.0;

#[derive(Debug, Error)]
pub enum DemandError {
    #[error("insufficient usage history: {available} of {required} days")]
    InsufficientHistory { available: usize, required: usize },
}

/// How a demand profile was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    MlForecast,
    Statistical,
    Default,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::MlForecast => "ml_forecast",
            CalculationMethod::Statistical => "statistical",
            CalculationMethod::Default => "default",
        }
    }

    /// Parse a stored method tag, falling back to `Default` for unknown tags
    pub fn parse(s: &str) -> Self {
        match s {
            "ml_forecast" => CalculationMethod::MlForecast,
            "statistical" => CalculationMethod::Statistical,
            _ => CalculationMethod::Default,
        }
    }

    /// Confidence attributed to profiles derived by this method
    pub fn confidence(&self) -> f64 {
        match self {
            CalculationMethod::MlForecast => 0.9,
            CalculationMethod::Statistical => 0.7,
            CalculationMethod::Default => 0.5,
        }
    }
}

/// Daily-demand mean and variability for one drug
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandProfile {
    pub avg_daily_demand: f64,
    pub std_dev: f64,
    pub method: CalculationMethod,
    pub confidence: f64,
}

impl DemandProfile {
    /// Profile from a forecast series covering `horizon_days`
    ///
    /// The mean divides by the horizon, not the series length, so a short
    /// series is treated as low demand rather than inflated.
    pub fn from_forecast(series: &[f64], horizon_days: u32) -> Self {
        let horizon = horizon_days.max(1) as f64;
        let avg = series.iter().sum::<f64>() / horizon;
        let std_dev = population_std_dev(series, avg);
        Self::floored(avg, std_dev, CalculationMethod::MlForecast)
    }

    /// Fallback profile from a trailing window of recorded usage
    pub fn from_history(usage: &[f64]) -> Result<Self, DemandError> {
        if usage.len() < MIN_HISTORY_DAYS {
            return Err(DemandError::InsufficientHistory {
                available: usage.len(),
                required: MIN_HISTORY_DAYS,
            });
        }
        let avg = usage.iter().sum::<f64>() / usage.len() as f64;
        let std_dev = population_std_dev(usage, avg);
        Ok(Self::floored(avg, std_dev, CalculationMethod::Statistical))
    }

    /// Fixed conservative profile for drugs with no forecast and no history
    pub fn conservative_default() -> Self {
        Self::floored(
            DEFAULT_AVG_DAILY_DEMAND,
            DEFAULT_DEMAND_STD_DEV,
            CalculationMethod::Default,
        )
    }

    fn floored(avg: f64, std_dev: f64, method: CalculationMethod) -> Self {
        Self {
            avg_daily_demand: floor_positive(avg),
            std_dev: floor_positive(std_dev),
            confidence: method.confidence(),
            method,
        }
    }
}

/// Clamp to the strictly positive demand floor; non-finite inputs collapse
/// to the floor as well
fn floor_positive(value: f64) -> f64 {
    if value.is_finite() {
        value.max(DEMAND_FLOOR)
    } else {
        DEMAND_FLOOR
    }
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_profile_divides_by_horizon() {
        let series = [10.0, 12.0, 8.0, 11.0, 9.0, 10.0, 10.0];
        let profile = DemandProfile::from_forecast(&series, 7);
        assert!((profile.avg_daily_demand - 10.0).abs() < 1e-9);
        assert_eq!(profile.method, CalculationMethod::MlForecast);
    }

    #[test]
    fn zero_series_is_floored() {
        let profile = DemandProfile::from_forecast(&[0.0; 7], 7);
        assert_eq!(profile.avg_daily_demand, DEMAND_FLOOR);
        assert_eq!(profile.std_dev, DEMAND_FLOOR);
    }

    #[test]
    fn short_history_is_rejected() {
        let err = DemandProfile::from_history(&[5.0, 6.0]).unwrap_err();
        assert!(matches!(
            err,
            DemandError::InsufficientHistory { available: 2, required: 3 }
        ));
    }

    #[test]
    fn default_profile_is_conservative() {
        let profile = DemandProfile::conservative_default();
        assert_eq!(profile.avg_daily_demand, DEFAULT_AVG_DAILY_DEMAND);
        assert_eq!(profile.std_dev, DEFAULT_DEMAND_STD_DEV);
        assert_eq!(profile.method, CalculationMethod::Default);
    }
}
