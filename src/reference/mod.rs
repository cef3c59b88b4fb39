//! Reference data consumed by the domain agents
//!
//! Each lookup either answers with a parsed value or signals `DataUnavailable`.
//! The agents own the fallback policy: a provider never substitutes data itself.
//!
//! Providers:
//! - `CsvReferenceData`: tables parsed from a reference data directory (the "live" source)
//! - `UnavailableReferenceData`: answers nothing, forcing every agent onto its fallback
//!
//! Built-in fallback tables live in `LifeTable` and `WorkLifeTable`.

mod life_table;
mod worklife;
pub mod loader;

pub use life_table::LifeTable;
pub use worklife::WorkLifeTable;
pub use loader::{LoadedReferenceData, WageSeriesRow, DEFAULT_REFERENCE_PATH};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::person::{EducationLevel, Sex};

/// Signal that a reference source could not supply a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataUnavailable {
    #[error("{source_name} did not answer within {timeout_ms} ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("no data for {0}")]
    Missing(String),

    #[error("source unreachable: {0}")]
    Unreachable(String),

    #[error("unusable value: {0}")]
    InvalidValue(String),
}

/// Geographic scope of a wage series, narrowest first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WageScope {
    County { state: String, county: String },
    State { state: String },
    National,
}

impl WageScope {
    /// Scopes to try for a home location, from narrowest to nationwide
    pub fn search_order(state: &str, county: &str) -> Vec<WageScope> {
        let state = state.trim();
        let county = county.trim();
        let mut scopes = Vec::with_capacity(3);

        if !state.is_empty() {
            if !county.is_empty() {
                scopes.push(WageScope::County {
                    state: state.to_string(),
                    county: county.to_string(),
                });
            }
            scopes.push(WageScope::State { state: state.to_string() });
        }
        scopes.push(WageScope::National);
        scopes
    }
}

impl fmt::Display for WageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WageScope::County { state, county } => write!(f, "{} County, {}", county, state),
            WageScope::State { state } => write!(f, "{}", state),
            WageScope::National => f.write_str("nationwide"),
        }
    }
}

/// Average wage for two consecutive periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WageSeries {
    pub prior: f64,
    pub current: f64,
    pub scope: WageScope,
}

/// Treasury constant-maturity term used as the risk-free rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTerm {
    #[default]
    OneYear,
    TenYear,
    ThirtyYear,
}

impl RateTerm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateTerm::OneYear => "1-year",
            RateTerm::TenYear => "10-year",
            RateTerm::ThirtyYear => "30-year",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1-year" | "1 year" | "1yr" | "one_year" => Some(RateTerm::OneYear),
            "10-year" | "10 year" | "10yr" | "ten_year" => Some(RateTerm::TenYear),
            "30-year" | "30 year" | "30yr" | "thirty_year" => Some(RateTerm::ThirtyYear),
            _ => None,
        }
    }
}

/// A published rate, in percent as quoted (4.5 means 4.5%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub rate_percent: f64,
    pub as_of: Option<NaiveDate>,
}

/// Source of reference values for the domain agents
///
/// Lookups are IO-bound in real deployments; callers bound them with
/// `lookup_with_timeout`.
#[async_trait]
pub trait ReferenceDataProvider: Send + Sync {
    /// Human-readable source name recorded in provenance
    fn name(&self) -> &str;

    /// Remaining years of life at `age`
    async fn remaining_life_expectancy(&self, age: u32, sex: Sex) -> Result<f64, DataUnavailable>;

    /// Remaining years of labor force participation at `age`
    async fn work_life_expectancy(
        &self,
        age: u32,
        sex: Sex,
        education: EducationLevel,
    ) -> Result<f64, DataUnavailable>;

    /// Two-period wage series for an occupation within one scope
    async fn wage_series(&self, occupation: &str, scope: &WageScope) -> Result<WageSeries, DataUnavailable>;

    /// Latest published rate for a term
    async fn treasury_rate(&self, term: RateTerm) -> Result<RateObservation, DataUnavailable>;
}

/// Await a provider lookup, giving up after `timeout`
pub async fn lookup_with_timeout<T, F>(
    source_name: &str,
    timeout: Duration,
    lookup: F,
) -> Result<T, DataUnavailable>
where
    F: Future<Output = Result<T, DataUnavailable>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(answer) => answer,
        Err(_) => Err(DataUnavailable::Timeout {
            source_name: source_name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Reject negative and non-finite year counts from a source
pub fn check_years(what: &str, years: f64) -> Result<f64, DataUnavailable> {
    if years.is_finite() && years >= 0.0 {
        Ok(years)
    } else {
        Err(DataUnavailable::InvalidValue(format!("{} = {}", what, years)))
    }
}

/// Linear interpolation over (age, value) points sorted by age.
/// Returns None outside the tabulated range.
pub(crate) fn interpolate(points: &[(u32, f64)], age: u32) -> Option<f64> {
    let (first_age, _) = *points.first()?;
    let (last_age, _) = *points.last()?;
    if age < first_age || age > last_age {
        return None;
    }

    let upper = points.iter().position(|&(a, _)| a >= age)?;
    let (a1, v1) = points[upper];
    if a1 == age || upper == 0 {
        return Some(v1);
    }

    let (a0, v0) = points[upper - 1];
    let ratio = (age - a0) as f64 / (a1 - a0) as f64;
    Some(v0 + (v1 - v0) * ratio)
}

/// Provider that never answers; every agent falls back
#[derive(Debug, Clone, Default)]
pub struct UnavailableReferenceData;

#[async_trait]
impl ReferenceDataProvider for UnavailableReferenceData {
    fn name(&self) -> &str {
        "offline"
    }

    async fn remaining_life_expectancy(&self, _age: u32, _sex: Sex) -> Result<f64, DataUnavailable> {
        Err(DataUnavailable::Unreachable("no life table source configured".into()))
    }

    async fn work_life_expectancy(
        &self,
        _age: u32,
        _sex: Sex,
        _education: EducationLevel,
    ) -> Result<f64, DataUnavailable> {
        Err(DataUnavailable::Unreachable("no work-life table source configured".into()))
    }

    async fn wage_series(&self, _occupation: &str, _scope: &WageScope) -> Result<WageSeries, DataUnavailable> {
        Err(DataUnavailable::Unreachable("no wage survey source configured".into()))
    }

    async fn treasury_rate(&self, _term: RateTerm) -> Result<RateObservation, DataUnavailable> {
        Err(DataUnavailable::Unreachable("no treasury rate source configured".into()))
    }
}

/// Reference tables parsed from CSV files in a data directory
#[derive(Debug, Clone)]
pub struct CsvReferenceData {
    label: String,
    data: LoadedReferenceData,
}

impl CsvReferenceData {
    /// Load from the default location (data/reference/)
    pub fn from_csv() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::from_csv_path(Path::new(DEFAULT_REFERENCE_PATH))
    }

    /// Load from a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let data = LoadedReferenceData::load_from(path)?;
        Ok(Self::from_loaded(format!("reference tables ({})", path.display()), data))
    }

    /// Wrap tables that were already parsed
    pub fn from_loaded(label: impl Into<String>, data: LoadedReferenceData) -> Self {
        Self { label: label.into(), data }
    }
}

#[async_trait]
impl ReferenceDataProvider for CsvReferenceData {
    fn name(&self) -> &str {
        &self.label
    }

    async fn remaining_life_expectancy(&self, age: u32, sex: Sex) -> Result<f64, DataUnavailable> {
        let table = self
            .data
            .life_table
            .as_ref()
            .ok_or_else(|| DataUnavailable::Missing("life table".into()))?;
        table
            .remaining_life(age, sex)
            .ok_or_else(|| DataUnavailable::Missing(format!("life table row for age {} ({})", age, sex)))
    }

    async fn work_life_expectancy(
        &self,
        age: u32,
        sex: Sex,
        education: EducationLevel,
    ) -> Result<f64, DataUnavailable> {
        let table = self
            .data
            .worklife_table
            .as_ref()
            .ok_or_else(|| DataUnavailable::Missing("work-life table".into()))?;
        table.years(age, sex, education).ok_or_else(|| {
            DataUnavailable::Missing(format!("work-life row for age {} ({}, {})", age, sex, education))
        })
    }

    async fn wage_series(&self, occupation: &str, scope: &WageScope) -> Result<WageSeries, DataUnavailable> {
        self.data
            .wage_series
            .iter()
            .find(|row| row.matches(occupation, scope))
            .map(|row| WageSeries {
                prior: row.prior,
                current: row.current,
                scope: scope.clone(),
            })
            .ok_or_else(|| DataUnavailable::Missing(format!("wage series for {} ({})", occupation, scope)))
    }

    async fn treasury_rate(&self, term: RateTerm) -> Result<RateObservation, DataUnavailable> {
        self.data
            .treasury_rates
            .iter()
            .filter(|(_, row_term, _)| *row_term == term)
            .max_by_key(|(date, _, _)| *date)
            .map(|(date, _, rate)| RateObservation {
                rate_percent: *rate,
                as_of: Some(*date),
            })
            .ok_or_else(|| DataUnavailable::Missing(format!("{} treasury rate", term.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate() {
        let points = [(40, 37.9), (45, 33.2), (50, 28.6)];
        assert_eq!(interpolate(&points, 45), Some(33.2));
        assert_eq!(interpolate(&points, 40), Some(37.9));

        let mid = interpolate(&points, 44).unwrap();
        assert!((mid - (37.9 - 4.7 * 0.8)).abs() < 1e-10);

        assert_eq!(interpolate(&points, 39), None);
        assert_eq!(interpolate(&points, 51), None);
        assert_eq!(interpolate(&[], 40), None);
    }

    #[test]
    fn test_wage_scope_search_order() {
        let scopes = WageScope::search_order("California", "Los Angeles");
        assert_eq!(scopes.len(), 3);
        assert_eq!(scopes[2], WageScope::National);

        let scopes = WageScope::search_order("", "Los Angeles");
        assert_eq!(scopes, vec![WageScope::National]);
    }

    #[test]
    fn test_check_years() {
        assert_eq!(check_years("life", 12.5), Ok(12.5));
        assert!(check_years("life", -1.0).is_err());
        assert!(check_years("life", f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<f64, DataUnavailable>(1.0)
        };
        let result = lookup_with_timeout("slow source", Duration::from_millis(20), slow).await;
        assert!(matches!(result, Err(DataUnavailable::Timeout { timeout_ms: 20, .. })));
    }

    #[tokio::test]
    async fn test_unavailable_provider() {
        let provider = UnavailableReferenceData;
        assert!(provider.remaining_life_expectancy(44, Sex::Male).await.is_err());
        assert!(provider.treasury_rate(RateTerm::OneYear).await.is_err());
    }
}
