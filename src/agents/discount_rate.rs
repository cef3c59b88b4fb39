use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::{DomainAgent, DomainResult, DomainValue, Provenance};
use crate::error::Result;
use crate::person::PersonRecord;
use crate::reference::{lookup_with_timeout, DataUnavailable, RateObservation, RateTerm, ReferenceDataProvider};
use crate::session::PipelineStep;

/// Highest annual rate accepted from a source (20%)
pub const MAX_DISCOUNT_RATE: f64 = 0.20;

/// Risk-free discount rate from the latest treasury yield
pub struct DiscountRateAgent {
    provider: Arc<dyn ReferenceDataProvider>,
    timeout: Duration,
    term: RateTerm,
    fallback_rate: f64,
}

impl DiscountRateAgent {
    pub fn new(provider: Arc<dyn ReferenceDataProvider>, timeout: Duration, term: RateTerm, fallback_rate: f64) -> Self {
        Self {
            provider,
            timeout,
            term,
            fallback_rate,
        }
    }
}

/// Convert a quoted percentage into a decimal rate in (0, MAX_DISCOUNT_RATE]
pub fn decimal_rate(observation: &RateObservation) -> std::result::Result<f64, DataUnavailable> {
    let rate = observation.rate_percent / 100.0;
    if rate.is_finite() && rate > 0.0 && rate <= MAX_DISCOUNT_RATE {
        Ok(rate)
    } else {
        Err(DataUnavailable::InvalidValue(format!(
            "treasury rate {}%",
            observation.rate_percent
        )))
    }
}

#[async_trait]
impl DomainAgent for DiscountRateAgent {
    fn step(&self) -> PipelineStep {
        PipelineStep::DiscountRate
    }

    async fn compute(&self, _person: &PersonRecord) -> Result<DomainResult> {
        let source = self.provider.name();

        let lookup = lookup_with_timeout(source, self.timeout, self.provider.treasury_rate(self.term))
            .await
            .and_then(|observation| decimal_rate(&observation).map(|rate| (rate, observation.as_of)));

        let (annual_rate, as_of, provenance) = match lookup {
            Ok((rate, as_of)) => {
                debug!("{} treasury rate {:.4} from {}", self.term.as_str(), rate, source);
                let description = match as_of {
                    Some(date) => format!("{} {} treasury as of {}", source, self.term.as_str(), date),
                    None => format!("{} {} treasury", source, self.term.as_str()),
                };
                (rate, as_of, Provenance::live(description))
            }
            Err(reason) => {
                warn!(
                    "{} treasury rate unavailable ({}); using fallback rate {:.2}%",
                    self.term.as_str(),
                    reason,
                    self.fallback_rate * 100.0
                );
                (
                    self.fallback_rate,
                    None,
                    Provenance::fallback(format!("default discount rate ({})", reason)),
                )
            }
        };

        Ok(DomainResult {
            step: self.step(),
            value: DomainValue::DiscountRate {
                annual_rate,
                term: self.term,
                as_of,
            },
            provenance,
        })
    }
}
