//! Orchestration of one analysis per session
//!
//! `start_run` registers a session and returns its id immediately; the
//! pipeline runs on a background tokio task. Steps execute strictly in order:
//!
//! 1. person validation
//! 2. life expectancy, work-life, wage growth, discount rate (one agent each)
//! 3. earnings timeline
//! 4. present value aggregation
//! 5. report generation
//!
//! Each step is marked IN_PROGRESS before its work starts and COMPLETED or
//! ERROR after. The first failing step ends the run in ERROR and leaves later
//! steps PENDING. Every started run reaches COMPLETED or ERROR, including when
//! its worker task panics.

use log::{error, info};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::{standard_agents, DomainAgent, DomainResult, DomainResults};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::person::PersonRecord;
use crate::projection::{PipelineResult, TimelineBuilder};
use crate::reference::ReferenceDataProvider;
use crate::report::ReportGenerator;
use crate::session::{Outcome, PipelineStep, RunStatus, Session, SessionId, SessionStore, StepStatus};

/// Runs analyses and records their progress in a shared session store
#[derive(Clone)]
pub struct Supervisor {
    store: Arc<SessionStore>,
    agents: Arc<Vec<Box<dyn DomainAgent>>>,
    reporter: Option<Arc<dyn ReportGenerator>>,
    config: PipelineConfig,
}

impl Supervisor {
    /// Supervisor with the standard agents over `provider` and no report generator
    pub fn new(store: Arc<SessionStore>, provider: Arc<dyn ReferenceDataProvider>, config: PipelineConfig) -> Self {
        let agents = standard_agents(provider, &config);
        Self {
            store,
            agents: Arc::new(agents),
            reporter: None,
            config,
        }
    }

    /// Replace the domain agents (run in the order given)
    pub fn with_agents(mut self, agents: Vec<Box<dyn DomainAgent>>) -> Self {
        self.agents = Arc::new(agents);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ReportGenerator>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Register a run and start it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_run(&self, person: PersonRecord) -> Result<SessionId> {
        let id = SessionId::new();
        self.store.create(id.clone(), person.clone())?;
        info!("Session {} started for {}", id, person.name);

        let worker = self.clone();
        let run_id = id.clone();
        tokio::spawn(async move {
            worker.run_guarded(run_id, person).await;
        });

        Ok(id)
    }

    /// Current snapshot of a run
    pub fn get_progress(&self, id: &SessionId) -> Result<Session> {
        self.store.get(id)
    }

    /// Run an analysis on the current task and return its terminal session
    pub async fn run_to_completion(&self, person: PersonRecord) -> Result<Session> {
        let id = SessionId::new();
        self.store.create(id.clone(), person.clone())?;
        self.run_guarded(id.clone(), person).await;
        self.store.get(&id)
    }

    /// Poll a run every `interval` until it is terminal
    pub async fn wait_for(&self, id: &SessionId, interval: Duration) -> Result<Session> {
        loop {
            let session = self.store.get(id)?;
            if session.is_terminal() {
                return Ok(session);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Execute on a nested task so a panic still finalizes the session
    async fn run_guarded(&self, id: SessionId, person: PersonRecord) {
        let inner = self.clone();
        let run_id = id.clone();
        let handle = tokio::spawn(async move { inner.execute(&run_id, person).await });

        if let Err(join_error) = handle.await {
            error!("Session {} worker failed: {}", id, join_error);
            let message = format!("InternalError: {}", join_error);
            match self.store.get(&id) {
                Ok(session) if session.status == RunStatus::Pending => {
                    if let Err(e) = self.store.begin(&id) {
                        error!("Session {} could not start: {}", id, e);
                    }
                }
                Ok(session) => {
                    let running = session.steps.iter().find(|s| s.status == RunStatus::InProgress);
                    if let Some(running) = running {
                        let update = StepStatus::failed(running.step, message.clone());
                        if let Err(e) = self.store.apply_step_update(&id, update) {
                            error!("Session {} step {} could not be failed: {}", id, running.step, e);
                        }
                    }
                }
                Err(e) => error!("Session {} lookup failed: {}", id, e),
            }
            let outcome = Outcome::Failed {
                errors: vec![message],
                partial: None,
            };
            if let Err(e) = self.store.finalize(&id, outcome) {
                error!("Session {} could not be finalized: {}", id, e);
            }
        }
    }

    async fn execute(&self, id: &SessionId, person: PersonRecord) {
        if let Err(e) = self.store.begin(id) {
            error!("Session {} could not start: {}", id, e);
            return;
        }

        let mut partial = None;
        let outcome = match self.run_steps(id, &person, &mut partial).await {
            Ok((result, artifacts)) => Outcome::Completed { result, artifacts },
            Err(e) => Outcome::Failed {
                errors: vec![format!("{}: {}", e.kind(), e)],
                partial,
            },
        };

        match self.store.finalize(id, outcome) {
            Ok(session) if session.status == RunStatus::Completed => info!(
                "Session {} completed: total economic loss ${:.2}",
                id,
                session.total_economic_loss().unwrap_or(0.0)
            ),
            Ok(session) => error!("Session {} failed: {}", id, session.errors.join("; ")),
            Err(e) => error!("Session {} could not be finalized: {}", id, e),
        }
    }

    async fn run_steps(
        &self,
        id: &SessionId,
        person: &PersonRecord,
        partial: &mut Option<PipelineResult>,
    ) -> Result<(PipelineResult, Vec<String>)> {
        self.run_step(
            id,
            PipelineStep::PersonValidation,
            "Validating person record",
            async { person.validate() },
            |_| ("Person record is valid".to_string(), None),
        )
        .await?;

        let cap = self.config.cap_work_life_at_life_expectancy;
        let mut domain_results: Vec<DomainResult> = Vec::with_capacity(self.agents.len());
        for agent in self.agents.iter() {
            let step = agent.step();
            // Cap work-life before its step is marked completed
            let remaining_life = domain_results
                .iter()
                .find(|r| r.step == PipelineStep::LifeExpectancy)
                .map(|r| r.value.scalar())
                .filter(|_| cap);
            let result = self
                .run_step(
                    id,
                    step,
                    format!("Computing {}", step.label().to_lowercase()),
                    async {
                        let mut result = agent.compute(person).await?;
                        if let Some(remaining) = remaining_life {
                            result.cap_work_life(remaining);
                        }
                        Ok::<_, PipelineError>(result)
                    },
                    |r: &DomainResult| (r.describe(), serde_json::to_value(r).ok()),
                )
                .await?;
            domain_results.push(result);
        }

        let builder = TimelineBuilder::new(self.config.max_projection_years);
        let (domain, timeline) = self
            .run_step(
                id,
                PipelineStep::Timeline,
                "Projecting annual earnings",
                async {
                    let domain = DomainResults::assemble(domain_results, cap)?;
                    let timeline = builder.build(person, &domain.timeline_inputs())?;
                    Ok::<_, PipelineError>((domain, timeline))
                },
                |(_, timeline)| {
                    let output = json!({
                        "years": timeline.len(),
                        "first_year": timeline.first().map(|e| e.year),
                        "last_year": timeline.last().map(|e| e.year),
                    });
                    (format!("{} years projected", timeline.len()), Some(output))
                },
            )
            .await?;

        let result = self
            .run_step(
                id,
                PipelineStep::Aggregation,
                "Summing present values",
                async { Ok::<_, PipelineError>(PipelineResult::aggregate(domain, timeline)) },
                |result| {
                    (
                        format!("Total economic loss ${:.2}", result.total_economic_loss),
                        Some(json!({ "total_economic_loss": result.total_economic_loss })),
                    )
                },
            )
            .await?;
        *partial = Some(result.clone());

        let artifacts = match &self.reporter {
            Some(reporter) => {
                let reporter = reporter.clone();
                let session = id.clone();
                let owner = person.clone();
                let finished = result.clone();
                self.run_step(
                    id,
                    PipelineStep::ReportGeneration,
                    "Writing report",
                    async move {
                        tokio::task::spawn_blocking(move || reporter.generate(&session, &owner, &finished))
                            .await
                            .map_err(|e| PipelineError::Computation(format!("report task failed: {}", e)))?
                            .map_err(PipelineError::from)
                    },
                    |artifacts| {
                        (
                            format!("{} artifact(s) written", artifacts.len()),
                            Some(json!({ "artifacts": artifacts })),
                        )
                    },
                )
                .await?
            }
            None => {
                self.run_step(
                    id,
                    PipelineStep::ReportGeneration,
                    "Writing report",
                    async { Ok::<_, PipelineError>(Vec::new()) },
                    |_| ("No report generator configured".to_string(), None),
                )
                .await?
            }
        };

        Ok((result, artifacts))
    }

    /// Mark `step` IN_PROGRESS, await `work`, then mark it COMPLETED or ERROR
    async fn run_step<T, F, D>(
        &self,
        id: &SessionId,
        step: PipelineStep,
        starting: impl Into<String>,
        work: F,
        describe: D,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        D: FnOnce(&T) -> (String, Option<serde_json::Value>),
    {
        self.store.apply_step_update(id, StepStatus::in_progress(step, starting))?;

        match work.await {
            Ok(value) => {
                let (message, output) = describe(&value);
                self.store.apply_step_update(id, StepStatus::completed(step, message, output))?;
                Ok(value)
            }
            Err(e) => {
                error!("Session {} step {} failed: {}", id, step, e);
                self.store
                    .apply_step_update(id, StepStatus::failed(step, format!("{}: {}", e.kind(), e)))?;
                Err(e)
            }
        }
    }
}
