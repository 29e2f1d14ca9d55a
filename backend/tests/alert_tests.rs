//! Alert engine tests
//!
//! Covers severity classification, the days-of-stock calculation, the status
//! state machine, and an in-memory simulation of the dedup and auto-resolve
//! behavior the database-backed engine implements.

use proptest::prelude::*;

use shared::{
    days_of_stock, is_valid_transition, low_stock_severity, predicted_stockout_severity,
    AlertSeverity, AlertStatus, AlertType, NO_DEMAND_DAYS_OF_STOCK, STOCKOUT_WARNING_DAYS,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Low-stock severity thresholds
    #[test]
    fn test_low_stock_severity() {
        assert_eq!(low_stock_severity(0, 50), AlertSeverity::Critical);
        // At exactly half the reorder level
        assert_eq!(low_stock_severity(25, 50), AlertSeverity::High);
        assert_eq!(low_stock_severity(26, 50), AlertSeverity::Medium);
        assert_eq!(low_stock_severity(50, 50), AlertSeverity::Medium);
    }

    /// Predicted-stockout severity thresholds
    #[test]
    fn test_predicted_stockout_severity() {
        assert_eq!(predicted_stockout_severity(0.5), AlertSeverity::Critical);
        assert_eq!(predicted_stockout_severity(1.0), AlertSeverity::Critical);
        assert_eq!(predicted_stockout_severity(1.5), AlertSeverity::High);
        assert_eq!(predicted_stockout_severity(2.0), AlertSeverity::High);
        assert_eq!(predicted_stockout_severity(2.5), AlertSeverity::Medium);
        assert_eq!(predicted_stockout_severity(3.0), AlertSeverity::Medium);
    }

    /// Days of stock at the forecast rate
    #[test]
    fn test_days_of_stock() {
        // 30 units at 70 predicted over 7 days = 10/day = 3 days
        assert!((days_of_stock(30, 70.0) - 3.0).abs() < 1e-9);
        // No predicted demand means effectively infinite runway
        assert_eq!(days_of_stock(100, 0.0), NO_DEMAND_DAYS_OF_STOCK);
        assert_eq!(days_of_stock(100, -5.0), NO_DEMAND_DAYS_OF_STOCK);
    }

    /// The stockout trigger window is 0 < days <= 3
    #[test]
    fn test_stockout_trigger_window() {
        let triggers = |stock: i64, total: f64| {
            let days = days_of_stock(stock, total);
            days > 0.0 && days <= STOCKOUT_WARNING_DAYS
        };

        assert!(triggers(30, 70.0)); // exactly 3 days
        assert!(triggers(10, 70.0)); // 1 day
        assert!(!triggers(31, 70.0)); // 3.1 days
        assert!(!triggers(0, 70.0)); // zero stock belongs to low_stock
        assert!(!triggers(100, 0.0)); // no demand, no alert
    }

    /// Legal transitions only
    #[test]
    fn test_valid_transitions() {
        let valid = [
            (AlertStatus::Active, AlertStatus::Acknowledged),
            (AlertStatus::Active, AlertStatus::Resolved),
            (AlertStatus::Active, AlertStatus::Dismissed),
            (AlertStatus::Acknowledged, AlertStatus::Resolved),
        ];
        for (from, to) in valid {
            assert!(is_valid_transition(from, to));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let invalid = [
            (AlertStatus::Resolved, AlertStatus::Active),
            (AlertStatus::Dismissed, AlertStatus::Acknowledged),
            (AlertStatus::Acknowledged, AlertStatus::Dismissed),
            (AlertStatus::Active, AlertStatus::Active),
            (AlertStatus::Resolved, AlertStatus::Resolved),
        ];
        for (from, to) in invalid {
            assert!(!is_valid_transition(from, to));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::Dismissed.is_terminal());
        assert!(!AlertStatus::Active.is_terminal());
        assert!(!AlertStatus::Acknowledged.is_terminal());
    }
}

// ============================================================================
// Engine Simulation (mirrors the database-backed dedup/auto-resolve logic)
// ============================================================================

#[cfg(test)]
mod engine_simulation {
    use super::*;

    /// In-memory stand-in for the alerts table plus its history
    #[derive(Default)]
    struct AlertStore {
        alerts: Vec<(AlertType, AlertStatus)>,
        history: Vec<(usize, &'static str)>,
    }

    impl AlertStore {
        /// Dedup-checked creation: a no-op when an active alert of the same
        /// type exists
        fn generate(&mut self, alert_type: AlertType, condition_holds: bool) -> bool {
            if !condition_holds {
                return false;
            }
            let has_active = self
                .alerts
                .iter()
                .any(|(t, s)| *t == alert_type && *s == AlertStatus::Active);
            if has_active {
                return false;
            }
            self.alerts.push((alert_type, AlertStatus::Active));
            self.history.push((self.alerts.len() - 1, "created"));
            true
        }

        /// Auto-resolve every active alert whose condition cleared
        fn resolve_outdated(&mut self, condition_holds: impl Fn(AlertType) -> bool) -> usize {
            let mut resolved = 0;
            for (idx, (alert_type, status)) in self.alerts.iter_mut().enumerate() {
                if *status == AlertStatus::Active && !condition_holds(*alert_type) {
                    *status = AlertStatus::Resolved;
                    self.history.push((idx, "auto_resolved"));
                    resolved += 1;
                }
            }
            resolved
        }

        fn active_count(&self, alert_type: AlertType) -> usize {
            self.alerts
                .iter()
                .filter(|(t, s)| *t == alert_type && *s == AlertStatus::Active)
                .count()
        }
    }

    /// Dedup invariant: generating twice yields exactly one active row
    #[test]
    fn test_dedup_invariant() {
        let mut store = AlertStore::default();
        assert!(store.generate(AlertType::LowStock, true));
        assert!(!store.generate(AlertType::LowStock, true));
        assert_eq!(store.active_count(AlertType::LowStock), 1);
    }

    /// Different alert types do not dedup against each other
    #[test]
    fn test_dedup_is_per_type() {
        let mut store = AlertStore::default();
        assert!(store.generate(AlertType::LowStock, true));
        assert!(store.generate(AlertType::PredictedStockout, true));
        assert_eq!(store.active_count(AlertType::LowStock), 1);
        assert_eq!(store.active_count(AlertType::PredictedStockout), 1);
    }

    /// Auto-resolve transitions the alert and appends a history row
    #[test]
    fn test_auto_resolve() {
        let mut store = AlertStore::default();
        store.generate(AlertType::LowStock, true);

        // Stock replenished: the low-stock condition no longer holds
        let resolved = store.resolve_outdated(|_| false);

        assert_eq!(resolved, 1);
        assert_eq!(store.active_count(AlertType::LowStock), 0);
        assert_eq!(store.alerts[0].1, AlertStatus::Resolved);
        assert!(store.history.contains(&(0, "auto_resolved")));
    }

    /// Alerts whose condition still holds stay active
    #[test]
    fn test_resolve_leaves_live_conditions() {
        let mut store = AlertStore::default();
        store.generate(AlertType::LowStock, true);
        store.generate(AlertType::PredictedStockout, true);

        let resolved = store.resolve_outdated(|t| t == AlertType::LowStock);

        assert_eq!(resolved, 1);
        assert_eq!(store.active_count(AlertType::LowStock), 1);
        assert_eq!(store.active_count(AlertType::PredictedStockout), 0);
    }

    /// After resolution the next condition breach opens a fresh alert
    #[test]
    fn test_regeneration_after_resolve() {
        let mut store = AlertStore::default();
        store.generate(AlertType::LowStock, true);
        store.resolve_outdated(|_| false);

        assert!(store.generate(AlertType::LowStock, true));
        assert_eq!(store.active_count(AlertType::LowStock), 1);
        assert_eq!(store.alerts.len(), 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Generated severities are never below medium
        #[test]
        fn prop_low_stock_severity_floor(
            stock in 0i64..10_000,
            level in 1i64..10_000,
        ) {
            let severity = low_stock_severity(stock, level);
            prop_assert!(severity >= AlertSeverity::Medium);
        }

        /// Severity is monotone: less stock is never less severe
        #[test]
        fn prop_low_stock_severity_monotone(
            stock in 1i64..10_000,
            level in 1i64..10_000,
        ) {
            let tighter = low_stock_severity(stock - 1, level);
            let looser = low_stock_severity(stock, level);
            prop_assert!(tighter >= looser);
        }

        /// Days of stock is finite and non-negative for positive demand
        #[test]
        fn prop_days_of_stock_finite(
            stock in 0i64..1_000_000,
            total in 1u32..100_000,
        ) {
            let days = days_of_stock(stock, total as f64);
            prop_assert!(days.is_finite());
            prop_assert!(days >= 0.0);
        }

        /// Exactly four of the sixteen status pairs are legal
        #[test]
        fn prop_transition_matrix(_seed in 0u8..1) {
            let all = [
                AlertStatus::Active,
                AlertStatus::Acknowledged,
                AlertStatus::Resolved,
                AlertStatus::Dismissed,
            ];
            let legal = all
                .iter()
                .flat_map(|from| all.iter().map(move |to| (*from, *to)))
                .filter(|(from, to)| is_valid_transition(*from, *to))
                .count();
            prop_assert_eq!(legal, 4);
        }
    }
}
