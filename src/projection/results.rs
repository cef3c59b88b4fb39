//! Timeline rows and the aggregated pipeline result

use serde::{Deserialize, Serialize};

use crate::agents::DomainResults;
use crate::person::PersonRecord;

/// One projected year of lost earnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Calendar year
    pub year: i32,

    /// Years since the year of death (0 = year of death)
    pub year_offset: u32,

    /// Age attained in this year
    pub age: u32,

    pub projected_earnings: f64,

    /// Undiscounted earnings through this year
    pub cumulative_earnings: f64,

    pub discount_factor: f64,
    pub present_value: f64,

    /// Present value through this year
    pub cumulative_present_value: f64,
}

/// Final output of the pipeline; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Last entry's cumulative present value, or 0 for an empty timeline
    pub total_economic_loss: f64,

    #[serde(flatten)]
    pub domain: DomainResults,

    pub timeline: Vec<TimelineEntry>,
}

impl PipelineResult {
    /// Reduce a timeline into the final result
    pub fn aggregate(domain: DomainResults, timeline: Vec<TimelineEntry>) -> Self {
        let total_economic_loss = timeline
            .last()
            .map(|entry| entry.cumulative_present_value)
            .unwrap_or(0.0);

        Self {
            total_economic_loss,
            domain,
            timeline,
        }
    }

    /// Key scalar metrics for display and reports
    pub fn summary(&self, person: &PersonRecord) -> LossSummary {
        let total_projected_earnings = self.timeline.last().map(|e| e.cumulative_earnings).unwrap_or(0.0);
        let remaining_life_expectancy = self.domain.life_expectancy_years();

        LossSummary {
            name: person.name.clone(),
            age_at_death: person.age_at_death(),
            base_salary: person.annual_salary,
            remaining_life_expectancy,
            total_expected_lifespan: person.age_at_death() as f64 + remaining_life_expectancy,
            work_life_expectancy: self.domain.work_life_years(),
            wage_growth_rate: self.domain.wage_growth_rate(),
            discount_rate: self.domain.discount_rate(),
            years_projected: self.timeline.len() as u32,
            final_age: self.timeline.last().map(|e| e.age),
            total_projected_earnings,
            total_economic_loss: self.total_economic_loss,
            fallback_steps: self.domain.fallback_steps(),
        }
    }
}

/// Summary statistics for a completed analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossSummary {
    pub name: String,
    pub age_at_death: u32,
    pub base_salary: f64,
    pub remaining_life_expectancy: f64,
    pub total_expected_lifespan: f64,
    pub work_life_expectancy: f64,
    pub wage_growth_rate: f64,
    pub discount_rate: f64,
    pub years_projected: u32,
    pub final_age: Option<u32>,
    pub total_projected_earnings: f64,
    pub total_economic_loss: f64,

    /// Labels of the steps that used fallback data
    pub fallback_steps: Vec<String>,
}
