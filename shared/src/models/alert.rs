//! Alert models and lifecycle rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days-of-stock value reported when the forecast predicts no demand at all
pub const NO_DEMAND_DAYS_OF_STOCK: f64 = 999.0;

/// Predicted-stockout alerts trigger at or below this many days of stock
pub const STOCKOUT_WARNING_DAYS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    PredictedStockout,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::PredictedStockout => "predicted_stockout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low_stock" => Some(AlertType::LowStock),
            "predicted_stockout" => Some(AlertType::PredictedStockout),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(AlertSeverity::Low),
            "medium" => Some(AlertSeverity::Medium),
            "high" => Some(AlertSeverity::High),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AlertStatus::Active),
            "acknowledged" => Some(AlertStatus::Acknowledged),
            "resolved" => Some(AlertStatus::Resolved),
            "dismissed" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }
}

/// A staff-facing alert
///
/// Invariant: at most one `active` alert exists per (drug, type) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub drug_id: i32,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    /// Threshold the condition was evaluated against at creation time
    pub threshold: f64,
    /// Observed value at creation time (stock units or days of stock)
    pub current_value: f64,
    pub recommended_action: Option<String>,
    pub is_read: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One transition in an alert's lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub action: String,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Days of stock remaining at the forecast demand rate
pub fn days_of_stock(current_stock: i64, total_predicted_7_days: f64) -> f64 {
    if total_predicted_7_days <= 0.0 {
        return NO_DEMAND_DAYS_OF_STOCK;
    }
    current_stock as f64 / (total_predicted_7_days / 7.0)
}

/// Severity of a low-stock condition
pub fn low_stock_severity(current_stock: i64, reorder_level: i64) -> AlertSeverity {
    if current_stock <= 0 {
        AlertSeverity::Critical
    } else if (current_stock as f64) <= 0.5 * reorder_level as f64 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

/// Severity of a predicted-stockout condition
pub fn predicted_stockout_severity(days: f64) -> AlertSeverity {
    if days <= 1.0 {
        AlertSeverity::Critical
    } else if days <= 2.0 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

/// Whether a status transition is legal
///
/// `active -> acknowledged -> resolved` and `active -> {resolved, dismissed}`;
/// terminal states admit no further transitions.
pub fn is_valid_transition(from: AlertStatus, to: AlertStatus) -> bool {
    matches!(
        (from, to),
        (AlertStatus::Active, AlertStatus::Acknowledged)
            | (AlertStatus::Active, AlertStatus::Resolved)
            | (AlertStatus::Active, AlertStatus::Dismissed)
            | (AlertStatus::Acknowledged, AlertStatus::Resolved)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stock_is_critical() {
        assert_eq!(low_stock_severity(0, 50), AlertSeverity::Critical);
        assert_eq!(low_stock_severity(25, 50), AlertSeverity::High);
        assert_eq!(low_stock_severity(40, 50), AlertSeverity::Medium);
    }

    #[test]
    fn no_demand_means_effectively_infinite_runway() {
        assert_eq!(days_of_stock(100, 0.0), NO_DEMAND_DAYS_OF_STOCK);
        assert!((days_of_stock(30, 70.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for to in [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
            AlertStatus::Dismissed,
        ] {
            assert!(!is_valid_transition(AlertStatus::Resolved, to));
            assert!(!is_valid_transition(AlertStatus::Dismissed, to));
        }
    }
}
