use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::{DomainAgent, DomainResult, DomainValue, Provenance};
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;
use crate::reference::{check_years, lookup_with_timeout, ReferenceDataProvider, WorkLifeTable};
use crate::session::PipelineStep;

/// Expected remaining years in the labor force, by age, sex and education.
///
/// Capping at life expectancy happens when the domain results are assembled,
/// since that needs the other agent's output.
pub struct WorkLifeAgent {
    provider: Arc<dyn ReferenceDataProvider>,
    timeout: Duration,
    fallback: WorkLifeTable,
}

impl WorkLifeAgent {
    pub fn new(provider: Arc<dyn ReferenceDataProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            fallback: WorkLifeTable::skoog_2019_approx(),
        }
    }

    pub fn with_fallback(mut self, table: WorkLifeTable) -> Self {
        self.fallback = table;
        self
    }
}

#[async_trait]
impl DomainAgent for WorkLifeAgent {
    fn step(&self) -> PipelineStep {
        PipelineStep::WorkLife
    }

    async fn compute(&self, person: &PersonRecord) -> Result<DomainResult> {
        let age = person.age_at_death();
        let sex = person.sex;
        let education = person.education_level;
        let source = self.provider.name();

        let lookup = lookup_with_timeout(
            source,
            self.timeout,
            self.provider.work_life_expectancy(age, sex, education),
        )
        .await
        .and_then(|years| check_years("work-life expectancy", years));

        let (years, provenance) = match lookup {
            Ok(years) => {
                debug!("Work-life for {} {} at {}: {:.2} from {}", sex, education, age, years, source);
                (years, Provenance::live(source))
            }
            Err(reason) => {
                warn!("Work-life lookup failed for {}: {}; using {}", person.name, reason, self.fallback.label());
                let years = self.fallback.years_extended(age, sex, education).ok_or_else(|| {
                    PipelineError::Computation(format!(
                        "no work-life expectancy available for age {} ({}, {})",
                        age, sex, education
                    ))
                })?;
                (years, Provenance::fallback(format!("{} ({})", self.fallback.label(), reason)))
            }
        };

        Ok(DomainResult {
            step: self.step(),
            value: DomainValue::WorkLife {
                years,
                uncapped_years: years,
                capped: false,
            },
            provenance,
        })
    }
}
