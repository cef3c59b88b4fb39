//! Domain agents: one per reference input of the loss calculation
//!
//! Each agent asks the reference provider first and falls back to its own
//! built-in table or constant when the provider times out, is unreachable,
//! or returns something unusable. The result always records which source
//! supplied the value.

mod discount_rate;
mod life_expectancy;
mod wage_growth;
mod worklife;

pub use discount_rate::{DiscountRateAgent, MAX_DISCOUNT_RATE};
pub use life_expectancy::LifeExpectancyAgent;
pub use wage_growth::WageGrowthAgent;
pub use worklife::WorkLifeAgent;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;
use crate::projection::TimelineInputs;
use crate::reference::{RateTerm, ReferenceDataProvider};
use crate::session::PipelineStep;

/// Where a domain value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: DataSource,
    pub description: String,
}

impl Provenance {
    pub fn live(description: impl Into<String>) -> Self {
        Self {
            source: DataSource::Live,
            description: description.into(),
        }
    }

    pub fn fallback(description: impl Into<String>) -> Self {
        Self {
            source: DataSource::Fallback,
            description: description.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DataSource::Fallback
    }
}

/// Typed value produced by one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainValue {
    LifeExpectancy {
        /// Remaining years of life from the age at death
        remaining_years: f64,
        /// Age at death plus remaining years
        total_lifespan: f64,
    },
    WorkLife {
        years: f64,
        /// Value before capping at life expectancy
        uncapped_years: f64,
        capped: bool,
    },
    WageGrowth {
        annual_rate: f64,
        scope: String,
    },
    DiscountRate {
        annual_rate: f64,
        term: RateTerm,
        as_of: Option<NaiveDate>,
    },
}

impl DomainValue {
    /// The number the timeline consumes
    pub fn scalar(&self) -> f64 {
        match self {
            DomainValue::LifeExpectancy { remaining_years, .. } => *remaining_years,
            DomainValue::WorkLife { years, .. } => *years,
            DomainValue::WageGrowth { annual_rate, .. } => *annual_rate,
            DomainValue::DiscountRate { annual_rate, .. } => *annual_rate,
        }
    }
}

/// Output of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    pub step: PipelineStep,
    pub value: DomainValue,
    pub provenance: Provenance,
}

impl DomainResult {
    /// Step message shown to observers
    pub fn describe(&self) -> String {
        let value = match &self.value {
            DomainValue::LifeExpectancy { remaining_years, .. } => format!("{:.2} years remaining", remaining_years),
            DomainValue::WorkLife { years, capped: true, .. } => {
                format!("{:.2} years (capped at life expectancy)", years)
            }
            DomainValue::WorkLife { years, .. } => format!("{:.2} years", years),
            DomainValue::WageGrowth { annual_rate, .. } => format!("{:.2}% per year", annual_rate * 100.0),
            DomainValue::DiscountRate { annual_rate, .. } => format!("{:.2}% per year", annual_rate * 100.0),
        };
        match self.provenance.source {
            DataSource::Live => format!("{} from {}", value, self.provenance.description),
            DataSource::Fallback => format!("{} using fallback: {}", value, self.provenance.description),
        }
    }

    /// Limit a work-life value to `remaining` years of life; other values are untouched.
    ///
    /// Returns whether the value was reduced.
    pub fn cap_work_life(&mut self, remaining: f64) -> bool {
        let DomainValue::WorkLife { years, capped, .. } = &mut self.value else {
            return false;
        };
        if *years <= remaining {
            return false;
        }
        warn!(
            "Work-life expectancy {:.2} exceeds remaining life {:.2}; capping",
            years, remaining
        );
        *years = remaining;
        *capped = true;
        self.provenance.description.push_str(", capped at life expectancy");
        true
    }
}

/// A unit that computes one domain value for a person
#[async_trait]
pub trait DomainAgent: Send + Sync {
    /// Pipeline step this agent fills
    fn step(&self) -> PipelineStep;

    /// Compute the value, falling back internally when reference data is missing.
    ///
    /// Errors only when no usable value exists even after fallback.
    async fn compute(&self, person: &PersonRecord) -> Result<DomainResult>;
}

/// The four agents in execution order, sharing one provider
pub fn standard_agents(provider: Arc<dyn ReferenceDataProvider>, config: &PipelineConfig) -> Vec<Box<dyn DomainAgent>> {
    let timeout = config.provider_timeout();
    vec![
        Box::new(LifeExpectancyAgent::new(provider.clone(), timeout)),
        Box::new(WorkLifeAgent::new(provider.clone(), timeout)),
        Box::new(WageGrowthAgent::new(provider.clone(), timeout, config.fallback_wage_growth_rate)),
        Box::new(DiscountRateAgent::new(
            provider,
            timeout,
            config.rate_term,
            config.fallback_discount_rate,
        )),
    ]
}

/// The four domain results of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResults {
    pub life_expectancy: DomainResult,
    pub work_life: DomainResult,
    pub wage_growth: DomainResult,
    pub discount_rate: DomainResult,
}

impl DomainResults {
    /// Collect agent outputs, optionally capping work-life at remaining life
    pub fn assemble(results: Vec<DomainResult>, cap_work_life: bool) -> Result<Self> {
        let take = |step: PipelineStep| {
            results
                .iter()
                .find(|r| r.step == step)
                .cloned()
                .ok_or_else(|| PipelineError::Computation(format!("no result for {}", step)))
        };

        let life_expectancy = take(PipelineStep::LifeExpectancy)?;
        let mut work_life = take(PipelineStep::WorkLife)?;
        let wage_growth = take(PipelineStep::WageGrowth)?;
        let discount_rate = take(PipelineStep::DiscountRate)?;

        if cap_work_life {
            work_life.cap_work_life(life_expectancy.value.scalar());
        }

        Ok(Self {
            life_expectancy,
            work_life,
            wage_growth,
            discount_rate,
        })
    }

    /// Results built from known scalars rather than agents
    pub fn from_values(
        age_at_death: u32,
        life_expectancy_years: f64,
        work_life_years: f64,
        growth_rate: f64,
        discount_rate: f64,
    ) -> Self {
        let supplied = || Provenance::live("supplied values");
        Self {
            life_expectancy: DomainResult {
                step: PipelineStep::LifeExpectancy,
                value: DomainValue::LifeExpectancy {
                    remaining_years: life_expectancy_years,
                    total_lifespan: age_at_death as f64 + life_expectancy_years,
                },
                provenance: supplied(),
            },
            work_life: DomainResult {
                step: PipelineStep::WorkLife,
                value: DomainValue::WorkLife {
                    years: work_life_years,
                    uncapped_years: work_life_years,
                    capped: false,
                },
                provenance: supplied(),
            },
            wage_growth: DomainResult {
                step: PipelineStep::WageGrowth,
                value: DomainValue::WageGrowth {
                    annual_rate: growth_rate,
                    scope: "supplied".to_string(),
                },
                provenance: supplied(),
            },
            discount_rate: DomainResult {
                step: PipelineStep::DiscountRate,
                value: DomainValue::DiscountRate {
                    annual_rate: discount_rate,
                    term: RateTerm::default(),
                    as_of: None,
                },
                provenance: supplied(),
            },
        }
    }

    pub fn life_expectancy_years(&self) -> f64 {
        self.life_expectancy.value.scalar()
    }

    pub fn work_life_years(&self) -> f64 {
        self.work_life.value.scalar()
    }

    pub fn wage_growth_rate(&self) -> f64 {
        self.wage_growth.value.scalar()
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate.value.scalar()
    }

    /// Labels of steps whose value came from a fallback
    pub fn fallback_steps(&self) -> Vec<String> {
        [&self.life_expectancy, &self.work_life, &self.wage_growth, &self.discount_rate]
            .iter()
            .filter(|r| r.provenance.is_fallback())
            .map(|r| r.step.label().to_string())
            .collect()
    }

    pub fn timeline_inputs(&self) -> TimelineInputs {
        TimelineInputs {
            life_expectancy_years: self.life_expectancy_years(),
            work_life_years: self.work_life_years(),
            growth_rate: self.wage_growth_rate(),
            discount_rate: self.discount_rate(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_life_capped_at_life_expectancy() {
        let mut source = DomainResults::from_values(44, 8.0, 12.5, 0.03, 0.045);
        source.work_life.provenance = Provenance::fallback("built-in work-life table");

        let results = vec![
            source.life_expectancy.clone(),
            source.work_life.clone(),
            source.wage_growth.clone(),
            source.discount_rate.clone(),
        ];

        let capped = DomainResults::assemble(results.clone(), true).unwrap();
        assert_eq!(capped.work_life_years(), 8.0);
        assert!(matches!(
            capped.work_life.value,
            DomainValue::WorkLife {
                capped: true,
                uncapped_years,
                ..
            } if uncapped_years == 12.5
        ));
        assert!(capped.work_life.provenance.description.contains("capped"));
        assert_eq!(capped.fallback_steps(), vec!["Work-Life Expectancy".to_string()]);

        let uncapped = DomainResults::assemble(results, false).unwrap();
        assert_eq!(uncapped.work_life_years(), 12.5);
    }

    #[test]
    fn test_from_values_lifespan_includes_age() {
        let domain = DomainResults::from_values(44, 30.0, 20.0, 0.03, 0.045);
        assert_eq!(domain.life_expectancy_years(), 30.0);
        assert!(matches!(
            domain.life_expectancy.value,
            DomainValue::LifeExpectancy { total_lifespan, .. } if total_lifespan == 74.0
        ));
    }

    #[test]
    fn test_cap_ignores_other_values() {
        let mut growth = DomainResults::from_values(44, 8.0, 12.5, 0.03, 0.045).wage_growth;
        assert!(!growth.cap_work_life(0.01));
        assert_eq!(growth.value.scalar(), 0.03);
    }

    #[test]
    fn test_assemble_requires_every_step() {
        let source = DomainResults::from_values(44, 30.0, 20.0, 0.03, 0.045);
        let results = vec![source.life_expectancy, source.work_life, source.wage_growth];
        assert!(matches!(
            DomainResults::assemble(results, true),
            Err(PipelineError::Computation(_))
        ));
    }

    #[test]
    fn test_describe_marks_fallback() {
        let mut result = DomainResults::from_values(44, 30.0, 20.0, 0.025, 0.045).wage_growth;
        assert!(result.describe().starts_with("2.50% per year from"));

        result.provenance = Provenance::fallback("default growth rate");
        assert!(result.describe().contains("using fallback"));
    }

    #[test]
    fn test_domain_value_serializes_with_kind() {
        let value = DomainValue::WageGrowth {
            annual_rate: 0.03,
            scope: "nationwide".to_string(),
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "wage_growth");
        assert_eq!(json["annual_rate"], 0.03);
    }
}
