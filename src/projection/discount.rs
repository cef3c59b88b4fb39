//! Discounting of projected earnings to the date of death
//!
//! Rates are annual decimals (0.045 = 4.5%). Year offset 0 is the year of
//! death and is not discounted.

use serde::{Deserialize, Serialize};

/// Discount factor `1 / (1 + rate)^offset`
pub fn discount_factor(rate_per_year: f64, year_offset: u32) -> f64 {
    1.0 / (1.0 + rate_per_year).powi(year_offset as i32)
}

/// Single-rate annual discount curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountCurve {
    /// Annual discount rate (decimal)
    pub annual_rate: f64,
}

impl DiscountCurve {
    pub fn single_rate(annual_rate: f64) -> Self {
        Self { annual_rate }
    }

    /// Discount factor to a year offset from the date of death
    pub fn discount_to_year(&self, year_offset: u32) -> f64 {
        discount_factor(self.annual_rate, year_offset)
    }
}
