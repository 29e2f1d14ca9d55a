//! Inventory snapshot models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily stock snapshot for a drug
///
/// One row per drug per day. Same-day writes are merged by accumulating the
/// received/used quantities rather than inserting a second row; the latest
/// snapshot per drug is the authoritative current stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub drug_id: i32,
    pub snapshot_date: NaiveDate,
    pub opening_stock: i32,
    pub quantity_received: i32,
    pub quantity_used: i32,
    pub closing_stock: i32,
    pub stockout_flag: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventorySnapshot {
    /// Closing stock implied by the snapshot's own quantities, floored at zero
    pub fn derived_closing_stock(&self) -> i32 {
        (self.opening_stock + self.quantity_received - self.quantity_used).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(opening: i32, received: i32, used: i32) -> InventorySnapshot {
        let now = Utc::now();
        InventorySnapshot {
            drug_id: 1,
            snapshot_date: now.date_naive(),
            opening_stock: opening,
            quantity_received: received,
            quantity_used: used,
            closing_stock: 0,
            stockout_flag: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn closing_stock_accumulates_same_day_quantities() {
        // Two same-day writes merged: received 20 + 10, used 5 + 15
        let merged = snapshot(100, 30, 20);
        assert_eq!(merged.derived_closing_stock(), 110);
    }

    #[test]
    fn closing_stock_never_goes_negative() {
        let over_drawn = snapshot(10, 0, 25);
        assert_eq!(over_drawn.derived_closing_stock(), 0);
    }
}
