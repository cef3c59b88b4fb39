use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::{DomainAgent, DomainResult, DomainValue, Provenance};
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;
use crate::reference::{check_years, lookup_with_timeout, LifeTable, ReferenceDataProvider};
use crate::session::PipelineStep;

/// Remaining life expectancy at the age of death
pub struct LifeExpectancyAgent {
    provider: Arc<dyn ReferenceDataProvider>,
    timeout: Duration,
    fallback: LifeTable,
}

impl LifeExpectancyAgent {
    pub fn new(provider: Arc<dyn ReferenceDataProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            fallback: LifeTable::us_2019_abridged(),
        }
    }

    /// Replace the built-in fallback table
    pub fn with_fallback(mut self, table: LifeTable) -> Self {
        self.fallback = table;
        self
    }
}

#[async_trait]
impl DomainAgent for LifeExpectancyAgent {
    fn step(&self) -> PipelineStep {
        PipelineStep::LifeExpectancy
    }

    async fn compute(&self, person: &PersonRecord) -> Result<DomainResult> {
        let age = person.age_at_death();
        let source = self.provider.name();

        let lookup = lookup_with_timeout(
            source,
            self.timeout,
            self.provider.remaining_life_expectancy(age, person.sex),
        )
        .await
        .and_then(|years| check_years("remaining life expectancy", years));

        let (remaining_years, provenance) = match lookup {
            Ok(years) => {
                debug!("Life expectancy for {} at {}: {:.2} from {}", person.sex, age, years, source);
                (years, Provenance::live(source))
            }
            Err(reason) => {
                warn!("Life expectancy lookup failed for {}: {}; using {}", person.name, reason, self.fallback.label());
                let years = self.fallback.remaining_life_extended(age, person.sex).ok_or_else(|| {
                    PipelineError::Computation(format!("no life expectancy available for age {} ({})", age, person.sex))
                })?;
                (years, Provenance::fallback(format!("{} ({})", self.fallback.label(), reason)))
            }
        };

        Ok(DomainResult {
            step: self.step(),
            value: DomainValue::LifeExpectancy {
                remaining_years,
                total_lifespan: age as f64 + remaining_years,
            },
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{john_doe, ScriptedProvider};
    use crate::reference::DataUnavailable;
    use approx::assert_relative_eq;

    #[tokio::test]
    async fn test_live_value() {
        let provider = ScriptedProvider {
            life: Ok(35.0),
            ..ScriptedProvider::default()
        };
        let agent = LifeExpectancyAgent::new(Arc::new(provider), Duration::from_secs(1));
        let result = agent.compute(&john_doe()).await.unwrap();

        assert_eq!(result.value.scalar(), 35.0);
        assert!(!result.provenance.is_fallback());
        assert!(matches!(
            result.value,
            DomainValue::LifeExpectancy { total_lifespan, .. } if total_lifespan == 79.0
        ));
    }

    #[tokio::test]
    async fn test_fallback_on_unreachable() {
        let agent = LifeExpectancyAgent::new(Arc::new(ScriptedProvider::default()), Duration::from_secs(1));
        let result = agent.compute(&john_doe()).await.unwrap();

        // Built-in table, male aged 44
        assert_relative_eq!(result.value.scalar(), 34.14, epsilon = 1e-9);
        assert!(result.provenance.is_fallback());
    }

    #[tokio::test]
    async fn test_negative_value_is_treated_as_unavailable() {
        let provider = ScriptedProvider {
            life: Ok(-3.0),
            ..ScriptedProvider::default()
        };
        let agent = LifeExpectancyAgent::new(Arc::new(provider), Duration::from_secs(1));
        let result = agent.compute(&john_doe()).await.unwrap();
        assert!(result.provenance.is_fallback());
        assert!(result.provenance.description.contains("unusable value"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let provider = ScriptedProvider {
            life: Ok(35.0),
            delay: Some(Duration::from_secs(5)),
            ..ScriptedProvider::default()
        };
        let agent = LifeExpectancyAgent::new(Arc::new(provider), Duration::from_millis(20));
        let result = agent.compute(&john_doe()).await.unwrap();
        assert!(result.provenance.is_fallback());
        assert!(result.provenance.description.contains("did not answer"));
    }

    #[tokio::test]
    async fn test_empty_fallback_is_a_computation_error() {
        let provider = ScriptedProvider {
            life: Err(DataUnavailable::Missing("life table".into())),
            ..ScriptedProvider::default()
        };
        let agent = LifeExpectancyAgent::new(Arc::new(provider), Duration::from_secs(1))
            .with_fallback(LifeTable::from_rows("empty", &[]));
        assert!(matches!(
            agent.compute(&john_doe()).await,
            Err(PipelineError::Computation(_))
        ));
    }
}
