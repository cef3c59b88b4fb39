//! Forensic Economics - present-value economic loss for wrongful-death cases
//!
//! This library provides:
//! - Person records with validation and age derivation
//! - Reference data providers (life tables, work-life tables, wage series, treasury rates)
//!   with built-in fallbacks
//! - Domain agents for life expectancy, work-life expectancy, wage growth and discount rate
//! - Year-by-year earnings timeline, discounting and aggregation
//! - A supervisor that runs analyses in the background and tracks per-step progress
//!   in a shared session store

pub mod error;
pub mod config;
pub mod person;
pub mod reference;
pub mod agents;
pub mod projection;
pub mod session;
pub mod supervisor;
pub mod report;

// Re-export commonly used types
pub use error::{PipelineError, ReportError, Result};
pub use config::PipelineConfig;
pub use person::PersonRecord;
pub use reference::{CsvReferenceData, DataUnavailable, ReferenceDataProvider, UnavailableReferenceData};
pub use agents::{DomainAgent, DomainResult, DomainResults};
pub use projection::{PipelineResult, TimelineBuilder, TimelineEntry};
pub use session::{RunStatus, Session, SessionId, SessionStore};
pub use supervisor::Supervisor;
pub use report::{FileReportGenerator, ReportGenerator};
