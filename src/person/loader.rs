//! Load person records from JSON (single case) or CSV (batch of cases)

use super::{EducationLevel, EmploymentStatus, PersonRecord, Sex};
use chrono::NaiveDate;
use csv::Reader;
use std::error::Error;
use std::fs::File;
use std::path::Path;

type LoadResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Raw CSV row for a batch of cases
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    name: String,
    dob: String,
    dod: String,
    occupation: String,
    annual_salary: f64,
    sex: String,
    education_level: String,
    #[serde(default)]
    home_county: String,
    #[serde(default)]
    home_state: String,
    status: String,
}

impl CsvRow {
    fn to_person(self) -> LoadResult<PersonRecord> {
        Ok(PersonRecord {
            dob: parse_date(&self.dob)?,
            dod: parse_date(&self.dod)?,
            sex: self.sex.parse::<Sex>()?,
            education_level: self.education_level.parse::<EducationLevel>()?,
            status: self.status.parse::<EmploymentStatus>()?,
            name: self.name,
            occupation: self.occupation,
            annual_salary: self.annual_salary,
            home_county: self.home_county,
            home_state: self.home_state,
        })
    }
}

fn parse_date(raw: &str) -> LoadResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|e| format!("Invalid date '{}': {}", raw, e).into())
}

/// Load a single case from a JSON file
pub fn load_person_json<P: AsRef<Path>>(path: P) -> LoadResult<PersonRecord> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Load all cases from a CSV file
pub fn load_persons<P: AsRef<Path>>(path: P) -> LoadResult<Vec<PersonRecord>> {
    let file = File::open(path)?;
    load_persons_from_reader(file)
}

/// Load cases from any reader (e.g., string buffer, uploaded body)
pub fn load_persons_from_reader<R: std::io::Read>(reader: R) -> LoadResult<Vec<PersonRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut persons = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        persons.push(row.to_person()?);
    }

    Ok(persons)
}
