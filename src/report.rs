//! Report artifacts for a completed analysis
//!
//! `FileReportGenerator` writes two files per session into its output directory:
//! - `<name>_<session>_timeline.csv`: one row per projected year
//! - `<name>_<session>_summary.json`: headline metrics plus the full result

use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use crate::error::ReportError;
use crate::person::PersonRecord;
use crate::projection::{LossSummary, PipelineResult};
use crate::session::SessionId;

/// Renders a finished result into persisted artifacts
pub trait ReportGenerator: Send + Sync {
    /// Write the artifacts and return references to them
    fn generate(
        &self,
        session: &SessionId,
        person: &PersonRecord,
        result: &PipelineResult,
    ) -> Result<Vec<String>, ReportError>;
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    session_id: &'a SessionId,
    person: &'a PersonRecord,
    summary: LossSummary,
    result: &'a PipelineResult,
}

/// Writes CSV and JSON reports to a directory
#[derive(Debug, Clone)]
pub struct FileReportGenerator {
    output_dir: PathBuf,
}

impl FileReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

/// Lowercase alphanumerics joined by underscores ("John Doe" -> "john_doe")
fn file_stem(name: &str) -> String {
    let slug = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "analysis".to_string()
    } else {
        slug
    }
}

impl ReportGenerator for FileReportGenerator {
    fn generate(
        &self,
        session: &SessionId,
        person: &PersonRecord,
        result: &PipelineResult,
    ) -> Result<Vec<String>, ReportError> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = format!("{}_{}", file_stem(&person.name), session);

        let timeline_path = self.output_dir.join(format!("{}_timeline.csv", stem));
        let mut writer = csv::Writer::from_path(&timeline_path)?;
        for entry in &result.timeline {
            writer.serialize(entry)?;
        }
        writer.flush()?;

        let summary_path = self.output_dir.join(format!("{}_summary.json", stem));
        let document = SummaryDocument {
            session_id: session,
            person,
            summary: result.summary(person),
            result,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(&summary_path)?), &document)?;

        info!(
            "Wrote report for session {} to {}",
            session,
            self.output_dir.display()
        );

        Ok(vec![
            timeline_path.display().to_string(),
            summary_path.display().to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::DomainResults;
    use crate::person::{EducationLevel, EmploymentStatus, Sex};
    use crate::projection::{TimelineBuilder, TimelineInputs};
    use chrono::NaiveDate;

    fn test_person() -> PersonRecord {
        PersonRecord {
            name: "Mary-Ann O'Neil".to_string(),
            dob: NaiveDate::from_ymd_opt(1970, 5, 1).unwrap(),
            dod: NaiveDate::from_ymd_opt(2022, 11, 2).unwrap(),
            occupation: "Accountant".to_string(),
            annual_salary: 70_000.0,
            sex: Sex::Female,
            education_level: EducationLevel::Bachelors,
            home_county: String::new(),
            home_state: String::new(),
            status: EmploymentStatus::Active,
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("John Doe"), "john_doe");
        assert_eq!(file_stem("Mary-Ann O'Neil"), "mary_ann_o_neil");
        assert_eq!(file_stem("  "), "analysis");
    }

    #[test]
    fn test_writes_timeline_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let person = test_person();
        let inputs = TimelineInputs {
            life_expectancy_years: 30.0,
            work_life_years: 12.3,
            growth_rate: 0.02,
            discount_rate: 0.04,
        };
        let timeline = TimelineBuilder::new(120).build(&person, &inputs).unwrap();
        let result = PipelineResult::aggregate(DomainResults::from_values(44, 30.0, 12.3, 0.02, 0.04), timeline);

        let session = SessionId::from("abc123");
        let artifacts = FileReportGenerator::new(dir.path().join("out"))
            .generate(&session, &person, &result)
            .unwrap();
        assert_eq!(artifacts.len(), 2);

        let mut reader = csv::Reader::from_path(&artifacts[0]).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "year");
        assert_eq!(reader.records().count(), 13);

        let json: serde_json::Value = serde_json::from_reader(File::open(&artifacts[1]).unwrap()).unwrap();
        assert_eq!(json["session_id"], "abc123");
        assert_eq!(json["summary"]["years_projected"], 13);
        assert!(artifacts[1].ends_with("mary_ann_o_neil_abc123_summary.json"));
    }
}
