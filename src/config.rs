//! Pipeline configuration: policy values and provider limits
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::agents::MAX_DISCOUNT_RATE;
use crate::reference::RateTerm;

/// Default annual wage growth when no usable wage series exists (2.5%)
pub const DEFAULT_FALLBACK_WAGE_GROWTH_RATE: f64 = 0.025;

/// Default discount rate when no usable treasury rate exists (4.5%)
pub const DEFAULT_FALLBACK_DISCOUNT_RATE: f64 = 0.045;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bound on each reference provider call, in milliseconds
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Annual wage growth used when no wage series can be used
    #[serde(default = "default_fallback_wage_growth_rate")]
    pub fallback_wage_growth_rate: f64,

    /// Annual discount rate used when no treasury rate can be used
    #[serde(default = "default_fallback_discount_rate")]
    pub fallback_discount_rate: f64,

    /// Treasury term read as the risk-free rate
    #[serde(default)]
    pub rate_term: RateTerm,

    /// A person cannot work beyond death
    #[serde(default = "default_true")]
    pub cap_work_life_at_life_expectancy: bool,

    /// Longest timeline accepted before the run is treated as degenerate
    #[serde(default = "default_max_projection_years")]
    pub max_projection_years: u32,
}

fn default_provider_timeout_ms() -> u64 { 5_000 }
fn default_fallback_wage_growth_rate() -> f64 { DEFAULT_FALLBACK_WAGE_GROWTH_RATE }
fn default_fallback_discount_rate() -> f64 { DEFAULT_FALLBACK_DISCOUNT_RATE }
fn default_true() -> bool { true }
fn default_max_projection_years() -> u32 { 120 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout_ms(),
            fallback_wage_growth_rate: default_fallback_wage_growth_rate(),
            fallback_discount_rate: default_fallback_discount_rate(),
            rate_term: RateTerm::default(),
            cap_work_life_at_life_expectancy: true,
            max_projection_years: default_max_projection_years(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject policy values the pipeline would otherwise use silently
    pub fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let rate = self.fallback_discount_rate;
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_DISCOUNT_RATE {
            return Err(format!(
                "fallback_discount_rate must be in (0, {}], got {}",
                MAX_DISCOUNT_RATE, rate
            )
            .into());
        }
        let growth = self.fallback_wage_growth_rate;
        if !growth.is_finite() || growth <= -1.0 {
            return Err(format!("fallback_wage_growth_rate must be greater than -1, got {}", growth).into());
        }
        if self.provider_timeout_ms == 0 {
            return Err("provider_timeout_ms must be positive".into());
        }
        if self.max_projection_years == 0 {
            return Err("max_projection_years must be positive".into());
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Set the provider timeout
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
