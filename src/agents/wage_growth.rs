use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::{DomainAgent, DomainResult, DomainValue, Provenance};
use crate::error::Result;
use crate::person::PersonRecord;
use crate::reference::{lookup_with_timeout, DataUnavailable, ReferenceDataProvider, WageScope, WageSeries};
use crate::session::PipelineStep;

/// Annual wage growth for the person's occupation.
///
/// Scopes are tried from county to state to nationwide; the first usable
/// series wins. With none usable, the configured fallback rate applies.
pub struct WageGrowthAgent {
    provider: Arc<dyn ReferenceDataProvider>,
    timeout: Duration,
    fallback_rate: f64,
}

impl WageGrowthAgent {
    pub fn new(provider: Arc<dyn ReferenceDataProvider>, timeout: Duration, fallback_rate: f64) -> Self {
        Self {
            provider,
            timeout,
            fallback_rate,
        }
    }
}

/// (current - prior) / prior
pub fn growth_rate(series: &WageSeries) -> std::result::Result<f64, DataUnavailable> {
    if !series.prior.is_finite() || series.prior <= 0.0 {
        return Err(DataUnavailable::InvalidValue(format!(
            "prior period wage {} for {}",
            series.prior, series.scope
        )));
    }
    let rate = (series.current - series.prior) / series.prior;
    if !rate.is_finite() || rate <= -1.0 {
        return Err(DataUnavailable::InvalidValue(format!("growth rate {} for {}", rate, series.scope)));
    }
    Ok(rate)
}

#[async_trait]
impl DomainAgent for WageGrowthAgent {
    fn step(&self) -> PipelineStep {
        PipelineStep::WageGrowth
    }

    async fn compute(&self, person: &PersonRecord) -> Result<DomainResult> {
        let source = self.provider.name();
        let mut last_reason = None;

        for scope in WageScope::search_order(&person.home_state, &person.home_county) {
            let lookup = lookup_with_timeout(source, self.timeout, self.provider.wage_series(&person.occupation, &scope))
                .await
                .and_then(|series| growth_rate(&series));

            match lookup {
                Ok(annual_rate) => {
                    debug!("Wage growth for {} ({}): {:.4} from {}", person.occupation, scope, annual_rate, source);
                    return Ok(DomainResult {
                        step: self.step(),
                        value: DomainValue::WageGrowth {
                            annual_rate,
                            scope: scope.to_string(),
                        },
                        provenance: Provenance::live(format!("{}, {}", source, scope)),
                    });
                }
                Err(reason) => {
                    debug!("No usable wage series for {} ({}): {}", person.occupation, scope, reason);
                    last_reason = Some(reason);
                }
            }
        }

        let reason = last_reason.map(|r| r.to_string()).unwrap_or_else(|| "no scope searched".to_string());
        warn!(
            "Wage growth unavailable for {} ({}); using fallback rate {:.2}%",
            person.occupation,
            reason,
            self.fallback_rate * 100.0
        );

        Ok(DomainResult {
            step: self.step(),
            value: DomainValue::WageGrowth {
                annual_rate: self.fallback_rate,
                scope: "default".to_string(),
            },
            provenance: Provenance::fallback(format!("default growth rate ({})", reason)),
        })
    }
}
