//! Session and step state tracked for each pipeline run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::person::PersonRecord;
use crate::projection::PipelineResult;

/// Opaque identifier of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a run or of one of its steps
///
/// Pending -> InProgress -> {Completed, Error}; the last two are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Error)
    }

    /// Whether moving to `next` keeps the status moving forward
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (RunStatus::Pending, RunStatus::InProgress) => true,
            (RunStatus::InProgress, RunStatus::InProgress) => true,
            (RunStatus::InProgress, RunStatus::Completed | RunStatus::Error) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::InProgress => "IN_PROGRESS",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Pipeline steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStep {
    PersonValidation,
    LifeExpectancy,
    WorkLife,
    WageGrowth,
    DiscountRate,
    Timeline,
    Aggregation,
    ReportGeneration,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 8] = [
        PipelineStep::PersonValidation,
        PipelineStep::LifeExpectancy,
        PipelineStep::WorkLife,
        PipelineStep::WageGrowth,
        PipelineStep::DiscountRate,
        PipelineStep::Timeline,
        PipelineStep::Aggregation,
        PipelineStep::ReportGeneration,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PipelineStep::PersonValidation => "Person Validation",
            PipelineStep::LifeExpectancy => "Life Expectancy",
            PipelineStep::WorkLife => "Work-Life Expectancy",
            PipelineStep::WageGrowth => "Wage Growth",
            PipelineStep::DiscountRate => "Discount Rate",
            PipelineStep::Timeline => "Earnings Timeline",
            PipelineStep::Aggregation => "Present Value Aggregation",
            PipelineStep::ReportGeneration => "Report Generation",
        }
    }

    /// Position in `ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress of one step as last written by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    pub step: PipelineStep,
    pub status: RunStatus,
    pub message: String,

    /// Structured summary of what the step produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl StepStatus {
    pub fn pending(step: PipelineStep) -> Self {
        Self {
            step,
            status: RunStatus::Pending,
            message: String::new(),
            output: None,
        }
    }

    pub fn in_progress(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            status: RunStatus::InProgress,
            message: message.into(),
            output: None,
        }
    }

    pub fn completed(step: PipelineStep, message: impl Into<String>, output: Option<serde_json::Value>) -> Self {
        Self {
            step,
            status: RunStatus::Completed,
            message: message.into(),
            output,
        }
    }

    pub fn failed(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            status: RunStatus::Error,
            message: message.into(),
            output: None,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum Outcome {
    Completed {
        result: PipelineResult,
        artifacts: Vec<String>,
    },
    Failed {
        errors: Vec<String>,
        /// Result already aggregated before the failing step, if any
        partial: Option<PipelineResult>,
    },
}

/// Live and final state of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub person: PersonRecord,
    pub status: RunStatus,

    /// One entry per `PipelineStep`, in execution order
    pub steps: Vec<StepStatus>,

    /// Message of the step currently running (or the final state)
    pub current_step: String,

    pub result: Option<PipelineResult>,
    pub errors: Vec<String>,

    /// References to report artifacts
    pub artifacts: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// New run with every step pending
    pub fn new(id: SessionId, person: PersonRecord) -> Self {
        let now = Utc::now();
        Self {
            id,
            person,
            status: RunStatus::Pending,
            steps: PipelineStep::ALL.iter().map(|&step| StepStatus::pending(step)).collect(),
            current_step: "Initializing".to_string(),
            result: None,
            errors: Vec::new(),
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, step: PipelineStep) -> &StepStatus {
        &self.steps[step.index()]
    }

    /// (completed steps, total steps)
    pub fn progress(&self) -> (usize, usize) {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == RunStatus::Completed)
            .count();
        (completed, self.steps.len())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Economic loss if a result is attached
    pub fn total_economic_loss(&self) -> Option<f64> {
        self.result.as_ref().map(|r| r.total_economic_loss)
    }
}
