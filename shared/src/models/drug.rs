//! Drug catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked drug
///
/// `reorder_level` is the operational trigger point. It starts as the manually
/// configured level and is overwritten by the policy engine's intelligent
/// level on each recalculation; `calculated_reorder_level` retains the
/// undamped traditional estimate for audit and comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drug {
    pub id: i32,
    pub name: String,
    pub generic_name: Option<String>,
    /// Unit of measure (tablets, vials, bottles, ...)
    pub unit: String,
    pub supplier: Option<String>,
    /// Supplier lead time; the configured default applies when unset
    pub lead_time_days: Option<i32>,
    pub reorder_level: i32,
    /// Suggested order quantity when the reorder level is hit
    pub reorder_quantity: i32,
    pub calculated_reorder_level: Option<i32>,
    pub last_reorder_calculation: Option<DateTime<Utc>>,
    pub reorder_calculation_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Drug {
    /// First token of the generic name, used for tolerant forecast matching
    pub fn generic_first_token(&self) -> Option<&str> {
        self.generic_name
            .as_deref()
            .and_then(|g| g.split_whitespace().next())
    }
}
