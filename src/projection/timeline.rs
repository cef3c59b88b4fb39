//! Year-by-year projection of lost earnings
//!
//! years = ceil(min(life expectancy, work-life)); for offset i in 0..years:
//!   earnings_i = salary * (1 + g)^i
//!   pv_i       = earnings_i / (1 + r)^i
//!   cum_pv_i   = cum_pv_{i-1} + pv_i

use log::debug;

use super::discount::DiscountCurve;
use super::results::TimelineEntry;
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;

/// Scalar inputs to the timeline, taken from the domain results
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineInputs {
    pub life_expectancy_years: f64,
    pub work_life_years: f64,
    /// Annual wage growth (decimal)
    pub growth_rate: f64,
    /// Annual discount rate (decimal)
    pub discount_rate: f64,
}

/// Builds the earnings timeline for a person
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    max_years: u32,
}

impl TimelineBuilder {
    pub fn new(max_years: u32) -> Self {
        Self { max_years }
    }

    /// Number of projected years.
    ///
    /// A horizon at or below zero is a valid empty projection. Non-finite
    /// inputs, rates at or below -100%, and horizons past `max_years` are
    /// degenerate and rejected.
    pub fn projection_years(&self, inputs: &TimelineInputs) -> Result<u32> {
        let values = [
            ("life expectancy", inputs.life_expectancy_years),
            ("work-life", inputs.work_life_years),
            ("growth rate", inputs.growth_rate),
            ("discount rate", inputs.discount_rate),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(PipelineError::Computation(format!("{} is not a finite number ({})", name, value)));
            }
        }
        if inputs.growth_rate <= -1.0 {
            return Err(PipelineError::Computation(format!(
                "growth rate {} would make earnings non-positive",
                inputs.growth_rate
            )));
        }
        if inputs.discount_rate <= -1.0 {
            return Err(PipelineError::Computation(format!(
                "discount rate {} has no defined discount factor",
                inputs.discount_rate
            )));
        }

        let horizon = inputs.life_expectancy_years.min(inputs.work_life_years);
        if horizon <= 0.0 {
            return Ok(0);
        }

        let years = horizon.ceil();
        if years > self.max_years as f64 {
            return Err(PipelineError::Computation(format!(
                "timeline of {} years exceeds the {} year limit",
                years, self.max_years
            )));
        }
        Ok(years as u32)
    }

    /// Project earnings and present values for each year
    pub fn build(&self, person: &PersonRecord, inputs: &TimelineInputs) -> Result<Vec<TimelineEntry>> {
        let years = self.projection_years(inputs)?;
        let curve = DiscountCurve::single_rate(inputs.discount_rate);
        let base_salary = person.annual_salary;
        let age_at_death = person.age_at_death();
        let year_of_death = person.year_of_death();

        let mut timeline = Vec::with_capacity(years as usize);
        let mut cumulative_earnings = 0.0;
        let mut cumulative_pv = 0.0;

        for offset in 0..years {
            let projected_earnings = base_salary * (1.0 + inputs.growth_rate).powi(offset as i32);
            let discount_factor = curve.discount_to_year(offset);
            let present_value = projected_earnings * discount_factor;

            cumulative_earnings += projected_earnings;
            cumulative_pv += present_value;

            timeline.push(TimelineEntry {
                year: year_of_death + offset as i32,
                year_offset: offset,
                age: age_at_death + offset,
                projected_earnings,
                cumulative_earnings,
                discount_factor,
                present_value,
                cumulative_present_value: cumulative_pv,
            });
        }

        debug!(
            "Built {} year timeline for {} (horizon {:.2} years)",
            timeline.len(),
            person.name,
            inputs.life_expectancy_years.min(inputs.work_life_years)
        );

        Ok(timeline)
    }
}
