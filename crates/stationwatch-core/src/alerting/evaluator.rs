//! Capacity evaluation
//!
//! Converts a raw balance into the number of operations it can still pay for
//! and compares that against the station's emergency band. All arithmetic is
//! integer (floor) so alert boundaries are deterministic.

use crate::error::{Error, Result};
use crate::models::{BalanceReading, CapacityVerdict, U256};

/// Operations-remaining bound at or below which an alert fires:
/// `floor(emergency * threshold / 100)`.
pub fn trigger_bound(threshold: u32, emergency: u32) -> U256 {
    U256::from(u64::from(emergency) * u64::from(threshold) / 100)
}

/// Evaluate a reading against a station's cost and thresholds.
///
/// Fails with [`Error::InvalidConfiguration`] when `unit_cost` is zero or a
/// percentage is above 100. The caller skips the operator for this cycle.
pub fn evaluate(
    reading: &BalanceReading,
    unit_cost: U256,
    threshold: u32,
    emergency: u32,
) -> Result<CapacityVerdict> {
    if unit_cost.is_zero() {
        return Err(Error::invalid_configuration(format!(
            "unit cost must be positive (operator {})",
            reading.operator
        )));
    }
    if threshold > 100 || emergency > 100 {
        return Err(Error::invalid_configuration(format!(
            "threshold ({threshold}) and emergency ({emergency}) must be within 0..=100"
        )));
    }

    let operations_remaining = reading.raw_balance / unit_cost;
    let bound = trigger_bound(threshold, emergency);

    Ok(CapacityVerdict {
        operations_remaining,
        trigger_bound: bound,
        triggered: operations_remaining <= bound,
    })
}
