//! CSV-based reference data loader
//!
//! Loads parsed reference tables from CSV files in data/reference/.
//! Every file is optional: a missing file leaves that lookup unanswered,
//! which the agents treat as unavailable data.

use chrono::NaiveDate;
use log::{debug, info};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{LifeTable, RateTerm, WageScope, WorkLifeTable};
use crate::person::{EducationLevel, Sex};

/// Default path to reference data directory
pub const DEFAULT_REFERENCE_PATH: &str = "data/reference";

type LoadResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// One wage observation pair; empty state/county widen the scope
#[derive(Debug, Clone, PartialEq)]
pub struct WageSeriesRow {
    pub occupation: String,
    pub state: String,
    pub county: String,
    pub prior: f64,
    pub current: f64,
}

impl WageSeriesRow {
    /// Whether this row is the series for `occupation` at exactly `scope`
    pub fn matches(&self, occupation: &str, scope: &WageScope) -> bool {
        if !self.occupation.trim().eq_ignore_ascii_case(occupation.trim()) {
            return false;
        }
        match scope {
            WageScope::County { state, county } => {
                self.state.eq_ignore_ascii_case(state) && self.county.eq_ignore_ascii_case(county)
            }
            WageScope::State { state } => self.state.eq_ignore_ascii_case(state) && self.county.is_empty(),
            WageScope::National => self.state.is_empty() && self.county.is_empty(),
        }
    }
}

/// Trimmed column `index`, or an error naming the missing column
fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> LoadResult<&'a str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| format!("Missing column {} ({})", index, name).into())
}

/// Load life table from CSV: age,female,male
pub fn load_life_table<R: Read>(reader: R) -> LoadResult<LifeTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let age: u32 = field(&record, 0, "age")?.parse()?;
        let female: f64 = field(&record, 1, "female")?.parse()?;
        let male: f64 = field(&record, 2, "male")?.parse()?;
        rows.push((age, female, male));
    }

    Ok(LifeTable::from_rows("life table (CSV)", &rows))
}

/// Load work-life table from CSV: sex,education,age,years
pub fn load_worklife_table<R: Read>(reader: R) -> LoadResult<WorkLifeTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let sex: Sex = field(&record, 0, "sex")?.parse()?;
        let education: EducationLevel = field(&record, 1, "education")?.parse()?;
        let age: u32 = field(&record, 2, "age")?.parse()?;
        let years: f64 = field(&record, 3, "years")?.parse()?;
        rows.push((sex, education, age, years));
    }

    Ok(WorkLifeTable::from_rows("work-life table (CSV)", &rows))
}

/// Load wage series from CSV: occupation,state,county,prior,current
pub fn load_wage_series<R: Read>(reader: R) -> LoadResult<Vec<WageSeriesRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        rows.push(WageSeriesRow {
            occupation: field(&record, 0, "occupation")?.to_string(),
            state: field(&record, 1, "state")?.to_string(),
            county: field(&record, 2, "county")?.to_string(),
            prior: field(&record, 3, "prior")?.parse()?,
            current: field(&record, 4, "current")?.parse()?,
        });
    }

    Ok(rows)
}

/// Load treasury rates from CSV: date,term,rate_percent
pub fn load_treasury_rates<R: Read>(reader: R) -> LoadResult<Vec<(NaiveDate, RateTerm, f64)>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rates = Vec::new();

    for result in reader.records() {
        let record = result?;
        let date = NaiveDate::parse_from_str(field(&record, 0, "date")?, "%Y-%m-%d")?;
        let raw_term = field(&record, 1, "term")?;
        let term = RateTerm::parse(raw_term).ok_or_else(|| format!("Unknown rate term: {}", raw_term))?;
        let rate: f64 = field(&record, 2, "rate_percent")?.parse()?;
        rates.push((date, term, rate));
    }

    Ok(rates)
}

/// Tables read from a reference data directory
#[derive(Debug, Clone, Default)]
pub struct LoadedReferenceData {
    pub life_table: Option<LifeTable>,
    pub worklife_table: Option<WorkLifeTable>,
    pub wage_series: Vec<WageSeriesRow>,
    pub treasury_rates: Vec<(NaiveDate, RateTerm, f64)>,
}

impl LoadedReferenceData {
    /// Load every table present in `path`
    pub fn load_from(path: &Path) -> LoadResult<Self> {
        let mut loaded = Self::default();

        if let Some(file) = open_optional(path, "life_table.csv")? {
            loaded.life_table = Some(load_life_table(file)?);
        }
        if let Some(file) = open_optional(path, "worklife.csv")? {
            loaded.worklife_table = Some(load_worklife_table(file)?);
        }
        if let Some(file) = open_optional(path, "wage_series.csv")? {
            loaded.wage_series = load_wage_series(file)?;
        }
        if let Some(file) = open_optional(path, "treasury_rates.csv")? {
            loaded.treasury_rates = load_treasury_rates(file)?;
        }

        info!(
            "Loaded reference data from {}: life table {}, work-life table {}, {} wage series, {} treasury rates",
            path.display(),
            if loaded.life_table.is_some() { "yes" } else { "no" },
            if loaded.worklife_table.is_some() { "yes" } else { "no" },
            loaded.wage_series.len(),
            loaded.treasury_rates.len(),
        );

        Ok(loaded)
    }
}

fn open_optional(dir: &Path, name: &str) -> LoadResult<Option<File>> {
    let path = dir.join(name);
    if !path.exists() {
        debug!("Reference file {} not present", path.display());
        return Ok(None);
    }
    Ok(Some(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CsvReferenceData, ReferenceDataProvider};

    fn sample_data() -> LoadedReferenceData {
        let life = "age,female,male\n40,42.7,37.9\n45,38.0,33.2\n";
        let worklife = "sex,education,age,years\nMale,Bachelor's,40,24.2\nMale,Bachelor's,45,19.8\n";
        let wages = "occupation,state,county,prior,current\n\
                     Software Engineer,California,Los Angeles,100000,103500\n\
                     Software Engineer,,,95000,97850\n\
                     Paralegal,California,,60000,61500\n";
        let rates = "date,term,rate_percent\n2024-03-01,1-year,5.01\n2024-03-15,1-year,4.98\n2024-03-15,10-year,4.30\n";

        LoadedReferenceData {
            life_table: Some(load_life_table(life.as_bytes()).unwrap()),
            worklife_table: Some(load_worklife_table(worklife.as_bytes()).unwrap()),
            wage_series: load_wage_series(wages.as_bytes()).unwrap(),
            treasury_rates: load_treasury_rates(rates.as_bytes()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_csv_provider_lookups() {
        let provider = CsvReferenceData::from_loaded("test tables", sample_data());

        let le = provider.remaining_life_expectancy(45, Sex::Male).await.unwrap();
        assert!((le - 33.2).abs() < 1e-10);
        assert!(provider.remaining_life_expectancy(60, Sex::Male).await.is_err());

        let wl = provider
            .work_life_expectancy(45, Sex::Male, EducationLevel::Bachelors)
            .await
            .unwrap();
        assert!((wl - 19.8).abs() < 1e-10);
        assert!(provider
            .work_life_expectancy(45, Sex::Female, EducationLevel::Bachelors)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_wage_series_scopes() {
        let provider = CsvReferenceData::from_loaded("test tables", sample_data());

        let county = WageScope::County {
            state: "California".into(),
            county: "Los Angeles".into(),
        };
        let series = provider.wage_series("software engineer", &county).await.unwrap();
        assert_eq!(series.prior, 100000.0);

        let national = provider
            .wage_series("Software Engineer", &WageScope::National)
            .await
            .unwrap();
        assert_eq!(national.current, 97850.0);

        let state = WageScope::State { state: "California".into() };
        assert!(provider.wage_series("Software Engineer", &state).await.is_err());
        assert!(provider.wage_series("Paralegal", &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_latest_treasury_rate_wins() {
        let provider = CsvReferenceData::from_loaded("test tables", sample_data());
        let rate = provider.treasury_rate(RateTerm::OneYear).await.unwrap();
        assert!((rate.rate_percent - 4.98).abs() < 1e-10);
        assert_eq!(rate.as_of, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert!(provider.treasury_rate(RateTerm::ThirtyYear).await.is_err());
    }

    #[test]
    fn test_missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = LoadedReferenceData::load_from(dir.path()).unwrap();
        assert!(loaded.life_table.is_none());
        assert!(loaded.wage_series.is_empty());
    }

    #[test]
    fn test_bad_row_is_an_error() {
        assert!(load_life_table("age,female,male\nforty,42.7,37.9\n".as_bytes()).is_err());
        assert!(load_treasury_rates("date,term,rate_percent\n2024-03-01,7-year,4.1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_short_header_is_an_error() {
        assert!(load_life_table("age,female\n40,42.7\n".as_bytes()).is_err());
        assert!(load_worklife_table("sex,education,age\nMale,Bachelor's,40\n".as_bytes()).is_err());
        assert!(load_wage_series("occupation,state,county,prior\nParalegal,,,60000\n".as_bytes()).is_err());
        assert!(load_treasury_rates("date,term\n2024-03-01,1-year\n".as_bytes()).is_err());
    }
}
