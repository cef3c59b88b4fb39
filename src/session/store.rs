//! Process-wide registry of pipeline sessions
//!
//! One coarse lock guards the map. Writers (one orchestrator worker per
//! session) and readers (polling observers) each hold it only for a single
//! copy or update, never across an await point, so a reader never waits on
//! pipeline computation. Readers get snapshots; updates to one session are
//! applied in the order they are written.
//!
//! Sessions live in memory only and are lost on restart.

use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::state::{Outcome, RunStatus, Session, SessionId, StepStatus};
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are whole snapshots, so a panic elsewhere cannot leave one half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new run in PENDING
    pub fn create(&self, id: SessionId, person: PersonRecord) -> Result<Session> {
        let mut sessions = self.write();
        if sessions.contains_key(&id) {
            return Err(PipelineError::DuplicateSession(id));
        }
        let session = Session::new(id.clone(), person);
        sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Snapshot of a session's current state
    pub fn get(&self, id: &SessionId) -> Result<Session> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Ids of every session, in no particular order
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.read().keys().cloned().collect()
    }

    fn update<T>(&self, id: &SessionId, apply: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| PipelineError::NotFound(id.clone()))?;
        let value = apply(session)?;
        session.updated_at = Utc::now();
        Ok(value)
    }

    /// PENDING -> IN_PROGRESS
    pub fn begin(&self, id: &SessionId) -> Result<()> {
        self.update(id, |session| {
            transition(session, "run", session.status, RunStatus::InProgress)?;
            session.status = RunStatus::InProgress;
            session.current_step = "Starting analysis".to_string();
            Ok(())
        })
    }

    /// Overwrite the status of one step.
    ///
    /// Only an IN_PROGRESS session accepts updates, and a step never moves
    /// backwards (e.g. COMPLETED -> IN_PROGRESS).
    pub fn apply_step_update(&self, id: &SessionId, update: StepStatus) -> Result<()> {
        self.update(id, |session| {
            if session.status != RunStatus::InProgress {
                return Err(PipelineError::InvalidTransition {
                    session: session.id.clone(),
                    what: format!("step {}", update.step),
                    from: session.status,
                    to: update.status,
                });
            }

            let current = session.step(update.step).status;
            transition(session, &format!("step {}", update.step), current, update.status)?;

            debug!("Session {} step {} -> {}", session.id, update.step, update.status);
            session.current_step = match update.status {
                RunStatus::InProgress => format!("{}: {}", update.step, update.message),
                _ => format!("{} {}", update.step, update.status.as_str().to_lowercase()),
            };
            let index = update.step.index();
            session.steps[index] = update;
            Ok(())
        })
    }

    /// Move the session to its terminal state exactly once
    pub fn finalize(&self, id: &SessionId, outcome: Outcome) -> Result<Session> {
        self.update(id, |session| {
            match outcome {
                Outcome::Completed { result, artifacts } => {
                    transition(session, "run", session.status, RunStatus::Completed)?;
                    session.status = RunStatus::Completed;
                    session.current_step = "Analysis completed successfully".to_string();
                    session.result = Some(result);
                    session.artifacts = artifacts;
                }
                Outcome::Failed { errors, partial } => {
                    transition(session, "run", session.status, RunStatus::Error)?;
                    session.status = RunStatus::Error;
                    session.current_step = "Analysis failed".to_string();
                    session.errors = errors;
                    session.result = partial;
                }
            }
            Ok(session.clone())
        })
    }
}

fn transition(session: &Session, what: &str, from: RunStatus, to: RunStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition {
            session: session.id.clone(),
            what: what.to_string(),
            from,
            to,
        })
    }
}
