//! Person record for a single wrongful-death case

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// Oldest age any reference table is defined for
pub const MAX_AGE: u32 = 120;

/// Sex used for life and work-life table lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(alias = "M")]
    Male,
    #[serde(alias = "F")]
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Male" | "M" => Ok(Sex::Male),
            "Female" | "F" => Ok(Sex::Female),
            other => Err(format!("Unknown sex: {}", other)),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest completed education level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "Less than High School")]
    LessThanHighSchool,
    #[serde(rename = "High School")]
    HighSchool,
    #[serde(rename = "Some College")]
    SomeCollege,
    #[serde(rename = "Bachelor's")]
    Bachelors,
    #[serde(rename = "Master's")]
    Masters,
    Doctoral,
    Professional,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 7] = [
        EducationLevel::LessThanHighSchool,
        EducationLevel::HighSchool,
        EducationLevel::SomeCollege,
        EducationLevel::Bachelors,
        EducationLevel::Masters,
        EducationLevel::Doctoral,
        EducationLevel::Professional,
    ];

    /// Label as it appears in input files and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::LessThanHighSchool => "Less than High School",
            EducationLevel::HighSchool => "High School",
            EducationLevel::SomeCollege => "Some College",
            EducationLevel::Bachelors => "Bachelor's",
            EducationLevel::Masters => "Master's",
            EducationLevel::Doctoral => "Doctoral",
            EducationLevel::Professional => "Professional",
        }
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        EducationLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown education level: {}", s))
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employment status at the date of death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Active,
    Inactive,
}

impl FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Active" => Ok(EmploymentStatus::Active),
            "Inactive" => Ok(EmploymentStatus::Inactive),
            other => Err(format!("Unknown employment status: {}", other)),
        }
    }
}

/// The decedent whose lost earnings are being valued
///
/// Immutable once handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,

    /// Date of birth
    pub dob: NaiveDate,

    /// Date of death
    pub dod: NaiveDate,

    pub occupation: String,

    /// Base annual salary at the date of death
    pub annual_salary: f64,

    pub sex: Sex,

    pub education_level: EducationLevel,

    #[serde(default)]
    pub home_county: String,

    #[serde(default)]
    pub home_state: String,

    pub status: EmploymentStatus,
}

impl PersonRecord {
    /// Whole years between birth and death; an unreached birthday in the
    /// death year does not count
    pub fn age_at_death(&self) -> u32 {
        self.dod.years_since(self.dob).unwrap_or(0)
    }

    /// Calendar year of death, the first projected year
    pub fn year_of_death(&self) -> i32 {
        self.dod.year()
    }

    /// Cheap re-check of the fields the pipeline depends on.
    ///
    /// All problems are reported together rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if self.occupation.trim().is_empty() {
            errors.push("occupation is required".to_string());
        }
        if !self.annual_salary.is_finite() || self.annual_salary <= 0.0 {
            errors.push(format!("annual salary must be positive, got {}", self.annual_salary));
        }
        if self.dod < self.dob {
            errors.push(format!(
                "date of death {} precedes date of birth {}",
                self.dod, self.dob
            ));
        } else if self.age_at_death() > MAX_AGE {
            errors.push(format!(
                "age at death {} exceeds maximum supported age {}",
                self.age_at_death(),
                MAX_AGE
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(errors))
        }
    }
}
