//! Session tracking for pipeline runs observed by a polling client

mod state;
mod store;

pub use state::{Outcome, PipelineStep, RunStatus, Session, SessionId, StepStatus};
pub use store::SessionStore;
