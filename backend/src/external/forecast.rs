//! Demand forecast client
//!
//! Client for the ML demand-forecasting microservice. Any transport error,
//! timeout, non-2xx status, or response that fails validation is surfaced as
//! `ForecastUnavailable`; the caller switches to the statistical fallback
//! rather than proceeding with a partial value. Retries, if any, belong to
//! the batch driver, not this client.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::Drug;

use crate::error::{AppError, AppResult};

/// Client for the demand forecast microservice
#[derive(Clone)]
pub struct ForecastClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

/// Request body for forecast endpoints
#[derive(Debug, Serialize)]
pub struct ForecastRequest {
    pub days: u32,
}

/// One predicted day of demand
#[derive(Debug, Clone, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub predicted_demand: f64,
    pub day_of_week: String,
}

/// Forecast for a single drug over the requested horizon
#[derive(Debug, Clone, Deserialize)]
pub struct DrugForecast {
    pub drug_id: i32,
    pub drug_name: String,
    pub unit: String,
    pub current_stock: i64,
    pub forecasts: Vec<DailyForecast>,
    pub total_predicted_7_days: f64,
}

impl DrugForecast {
    /// Predicted daily values in series order
    pub fn series(&self) -> Vec<f64> {
        self.forecasts.iter().map(|f| f.predicted_demand).collect()
    }
}

/// Response from the all-drugs forecast endpoint
#[derive(Debug, Deserialize)]
struct AllForecastsResponse {
    forecasts: Vec<DrugForecast>,
}

/// Health report of the forecast service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastServiceHealth {
    pub status: String,
    pub models_loaded: i32,
}

impl ForecastClient {
    /// Create a new forecast client
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            http_client,
        }
    }

    /// Fetch the demand forecast for a single drug
    pub async fn get_forecast(&self, drug_id: i32, days: u32) -> AppResult<DrugForecast> {
        let url = format!("{}/forecast/{}", self.base_url, drug_id);
        let forecast: DrugForecast = self.post_forecast(&url, days).await?;
        validate_forecast(&forecast)?;
        Ok(forecast)
    }

    /// Fetch demand forecasts for all drugs the service has models for
    pub async fn get_all_forecasts(&self, days: u32) -> AppResult<Vec<DrugForecast>> {
        let url = format!("{}/forecast/all", self.base_url);
        let response: AllForecastsResponse = self.post_forecast(&url, days).await?;
        for forecast in &response.forecasts {
            validate_forecast(forecast)?;
        }
        Ok(response.forecasts)
    }

    /// Check the forecast service's own health endpoint
    pub async fn health(&self) -> AppResult<ForecastServiceHealth> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::ForecastUnavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ForecastUnavailable(format!(
                "Health check returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ForecastUnavailable(format!("Failed to parse response: {}", e)))
    }

    async fn post_forecast<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        days: u32,
    ) -> AppResult<T> {
        let response = self
            .http_client
            .post(url)
            .header("X-API-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&ForecastRequest { days })
            .send()
            .await
            .map_err(|e| AppError::ForecastUnavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ForecastUnavailable(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ForecastUnavailable(format!("Failed to parse response: {}", e)))
    }
}

/// Reject forecasts the policy engine cannot safely consume
fn validate_forecast(forecast: &DrugForecast) -> AppResult<()> {
    if forecast.forecasts.is_empty() {
        return Err(AppError::ForecastUnavailable(format!(
            "Empty forecast series for '{}'",
            forecast.drug_name
        )));
    }
    let valid = forecast
        .forecasts
        .iter()
        .all(|f| f.predicted_demand.is_finite() && f.predicted_demand >= 0.0);
    if !valid || !forecast.total_predicted_7_days.is_finite() {
        return Err(AppError::ForecastUnavailable(format!(
            "Invalid predicted demand for '{}'",
            forecast.drug_name
        )));
    }
    Ok(())
}

/// Match fetched forecasts to local drug records, tolerating naming drift.
///
/// Priority per drug: exact name match, then generic-name first token, then
/// substring containment. Drugs without a match are simply absent from the
/// map; the caller counts and skips them.
pub fn match_forecasts<'a>(
    drugs: &[Drug],
    forecasts: &'a [DrugForecast],
) -> HashMap<i32, &'a DrugForecast> {
    let mut matched = HashMap::new();

    for drug in drugs {
        let name = drug.name.to_lowercase();
        let generic_token = drug.generic_first_token().map(|t| t.to_lowercase());

        let exact = forecasts
            .iter()
            .find(|f| f.drug_name.to_lowercase() == name);

        let by_generic = || {
            let token = generic_token.as_deref()?;
            forecasts.iter().find(|f| {
                f.drug_name
                    .to_lowercase()
                    .split_whitespace()
                    .next()
                    .is_some_and(|first| first == token)
            })
        };

        let by_substring = || {
            forecasts.iter().find(|f| {
                let candidate = f.drug_name.to_lowercase();
                candidate.contains(&name) || name.contains(&candidate)
            })
        };

        if let Some(forecast) = exact.or_else(by_generic).or_else(by_substring) {
            matched.insert(drug.id, forecast);
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn drug(id: i32, name: &str, generic: Option<&str>) -> Drug {
        let now = Utc::now();
        Drug {
            id,
            name: name.to_string(),
            generic_name: generic.map(|g| g.to_string()),
            unit: "tablets".to_string(),
            supplier: None,
            lead_time_days: None,
            reorder_level: 50,
            reorder_quantity: 100,
            calculated_reorder_level: None,
            last_reorder_calculation: None,
            reorder_calculation_confidence: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn forecast(drug_id: i32, name: &str) -> DrugForecast {
        DrugForecast {
            drug_id,
            drug_name: name.to_string(),
            unit: "tablets".to_string(),
            current_stock: 100,
            forecasts: vec![DailyForecast {
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                predicted_demand: 10.0,
                day_of_week: "Saturday".to_string(),
            }],
            total_predicted_7_days: 70.0,
        }
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let drugs = vec![drug(1, "Paracetamol 500mg", None)];
        let forecasts = vec![
            forecast(10, "Paracetamol 500mg Extended"),
            forecast(11, "paracetamol 500mg"),
        ];
        let matched = match_forecasts(&drugs, &forecasts);
        assert_eq!(matched[&1].drug_id, 11);
    }

    #[test]
    fn generic_token_match_beats_substring() {
        let drugs = vec![drug(1, "Panadol", Some("Paracetamol 500mg"))];
        let forecasts = vec![
            forecast(10, "Something Panadolish"),
            forecast(11, "Paracetamol tablets"),
        ];
        let matched = match_forecasts(&drugs, &forecasts);
        assert_eq!(matched[&1].drug_id, 11);
    }

    #[test]
    fn unmatched_drugs_are_absent() {
        let drugs = vec![drug(1, "Amoxicillin", None), drug(2, "Ibuprofen", None)];
        let forecasts = vec![forecast(10, "Amoxicillin")];
        let matched = match_forecasts(&drugs, &forecasts);
        assert_eq!(matched.len(), 1);
        assert!(matched.contains_key(&1));
        assert!(!matched.contains_key(&2));
    }

    #[test]
    fn empty_series_is_rejected() {
        let mut f = forecast(1, "Paracetamol");
        f.forecasts.clear();
        assert!(validate_forecast(&f).is_err());
    }

    #[test]
    fn negative_demand_is_rejected() {
        let mut f = forecast(1, "Paracetamol");
        f.forecasts[0].predicted_demand = -2.0;
        assert!(validate_forecast(&f).is_err());
    }
}
