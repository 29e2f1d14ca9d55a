//! Validation utilities for the Pharma Inventory Platform

/// Validate snapshot quantities are non-negative
pub fn validate_snapshot_quantities(
    opening_stock: i32,
    quantity_received: i32,
    quantity_used: i32,
) -> Result<(), &'static str> {
    if opening_stock < 0 {
        return Err("Opening stock cannot be negative");
    }
    if quantity_received < 0 {
        return Err("Quantity received cannot be negative");
    }
    if quantity_used < 0 {
        return Err("Quantity used cannot be negative");
    }
    Ok(())
}

/// Validate a target service level (supported range 0.5-0.999)
pub fn validate_service_level(level: f64) -> Result<(), &'static str> {
    if !level.is_finite() || !(0.5..1.0).contains(&level) {
        return Err("Service level must be between 0.5 and 1.0");
    }
    Ok(())
}

/// Validate a supplier lead time in days
pub fn validate_lead_time(days: u32) -> Result<(), &'static str> {
    if days == 0 || days > 365 {
        return Err("Lead time must be between 1 and 365 days");
    }
    Ok(())
}

/// Validate a forecast horizon in days
pub fn validate_forecast_horizon(days: u32) -> Result<(), &'static str> {
    if days == 0 || days > 30 {
        return Err("Forecast horizon must be between 1 and 30 days");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_quantities_rejected() {
        assert!(validate_snapshot_quantities(10, 5, 3).is_ok());
        assert!(validate_snapshot_quantities(-1, 5, 3).is_err());
        assert!(validate_snapshot_quantities(10, -5, 3).is_err());
        assert!(validate_snapshot_quantities(10, 5, -3).is_err());
    }

    #[test]
    fn service_level_bounds() {
        assert!(validate_service_level(0.95).is_ok());
        assert!(validate_service_level(0.99).is_ok());
        assert!(validate_service_level(1.0).is_err());
        assert!(validate_service_level(0.2).is_err());
        assert!(validate_service_level(f64::NAN).is_err());
    }

    #[test]
    fn lead_time_bounds() {
        assert!(validate_lead_time(7).is_ok());
        assert!(validate_lead_time(0).is_err());
        assert!(validate_lead_time(400).is_err());
    }
}
