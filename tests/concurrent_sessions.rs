//! Integration tests for background runs sharing one session store

use async_trait::async_trait;
use chrono::NaiveDate;
use forensic_economics::person::{EducationLevel, EmploymentStatus, Sex};
use forensic_economics::reference::{RateObservation, RateTerm, WageScope, WageSeries};
use forensic_economics::session::PipelineStep;
use forensic_economics::{
    CsvReferenceData, DataUnavailable, PersonRecord, PipelineConfig, PipelineError, ReferenceDataProvider,
    RunStatus, Session, SessionId, SessionStore, Supervisor, UnavailableReferenceData,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn reference_data() -> Arc<dyn ReferenceDataProvider> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/reference");
    Arc::new(CsvReferenceData::from_csv_path(&dir).expect("reference data should load"))
}

fn john_doe() -> PersonRecord {
    PersonRecord {
        name: "John Doe".to_string(),
        dob: NaiveDate::from_ymd_opt(1980, 1, 15).unwrap(),
        dod: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        occupation: "Software Engineer".to_string(),
        annual_salary: 120_000.0,
        sex: Sex::Male,
        education_level: EducationLevel::Bachelors,
        home_county: "Los Angeles".to_string(),
        home_state: "California".to_string(),
        status: EmploymentStatus::Active,
    }
}

fn maria_lopez() -> PersonRecord {
    PersonRecord {
        name: "Maria Lopez".to_string(),
        dob: NaiveDate::from_ymd_opt(1975, 8, 2).unwrap(),
        dod: NaiveDate::from_ymd_opt(2023, 11, 9).unwrap(),
        occupation: "Registered Nurse".to_string(),
        annual_salary: 96_000.0,
        sex: Sex::Female,
        education_level: EducationLevel::Bachelors,
        home_county: "Multnomah".to_string(),
        home_state: "Oregon".to_string(),
        status: EmploymentStatus::Active,
    }
}

/// Steps run in order: nothing after a PENDING step has started
fn assert_ordered(session: &Session) {
    let mut seen_pending = false;
    for step in &session.steps {
        if step.status == RunStatus::Pending {
            seen_pending = true;
        } else {
            assert!(!seen_pending, "{} started before an earlier step", step.step);
        }
    }
}

async fn observe_until_done(supervisor: &Supervisor, id: &SessionId) -> Session {
    let mut last_completed = 0;
    loop {
        let session = supervisor.get_progress(id).unwrap();
        assert_ordered(&session);

        let (completed, _) = session.progress();
        assert!(completed >= last_completed, "progress went backwards");
        last_completed = completed;

        if session.is_terminal() {
            return session;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Answers every lookup after a long delay
struct SlowProvider;

#[async_trait]
impl ReferenceDataProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow source"
    }

    async fn remaining_life_expectancy(&self, _age: u32, _sex: Sex) -> Result<f64, DataUnavailable> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(50.0)
    }

    async fn work_life_expectancy(
        &self,
        _age: u32,
        _sex: Sex,
        _education: EducationLevel,
    ) -> Result<f64, DataUnavailable> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(40.0)
    }

    async fn wage_series(&self, _occupation: &str, scope: &WageScope) -> Result<WageSeries, DataUnavailable> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(WageSeries {
            prior: 100.0,
            current: 150.0,
            scope: scope.clone(),
        })
    }

    async fn treasury_rate(&self, _term: RateTerm) -> Result<RateObservation, DataUnavailable> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(RateObservation {
            rate_percent: 9.0,
            as_of: None,
        })
    }
}

#[tokio::test]
async fn test_reference_case_from_data_files() {
    let supervisor = Supervisor::new(Arc::new(SessionStore::new()), reference_data(), PipelineConfig::default());
    let session = supervisor.run_to_completion(john_doe()).await.unwrap();

    assert_eq!(session.status, RunStatus::Completed);
    let result = session.result.expect("completed run has a result");

    assert!((result.domain.work_life_years() - 20.52).abs() < 1e-9);
    assert!((result.domain.wage_growth_rate() - 0.03).abs() < 1e-9);
    assert!((result.domain.discount_rate() - 0.045).abs() < 1e-9);
    assert!(result.domain.fallback_steps().is_empty());

    assert_eq!(result.timeline.len(), 21);
    assert_eq!(result.timeline[0].present_value, 120_000.0);
    assert!(result.total_economic_loss > 2_000_000.0);
    assert!(result.total_economic_loss < 2_500_000.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_are_independent() {
    let store = Arc::new(SessionStore::new());
    let supervisor = Supervisor::new(store.clone(), reference_data(), PipelineConfig::default());

    let first = supervisor.start_run(john_doe()).unwrap();
    let second = supervisor.start_run(maria_lopez()).unwrap();
    assert_ne!(first, second);
    assert_eq!(store.len(), 2);

    let (a, b) = tokio::join!(
        observe_until_done(&supervisor, &first),
        observe_until_done(&supervisor, &second)
    );

    assert_eq!(a.status, RunStatus::Completed);
    assert_eq!(b.status, RunStatus::Completed);
    assert_eq!(a.person.name, "John Doe");
    assert_eq!(b.person.name, "Maria Lopez");
    assert_ne!(a.total_economic_loss(), b.total_economic_loss());
    assert_eq!(a.progress(), (PipelineStep::ALL.len(), PipelineStep::ALL.len()));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let supervisor = Supervisor::new(
        Arc::new(SessionStore::new()),
        Arc::new(UnavailableReferenceData),
        PipelineConfig::default(),
    );
    let result = supervisor.get_progress(&SessionId::from("does-not-exist"));
    assert!(matches!(result, Err(PipelineError::NotFound(_))));
}

#[tokio::test]
async fn test_provider_outage_completes_with_fallbacks() {
    let supervisor = Supervisor::new(
        Arc::new(SessionStore::new()),
        Arc::new(UnavailableReferenceData),
        PipelineConfig::default(),
    );
    let id = supervisor.start_run(john_doe()).unwrap();
    let session = observe_until_done(&supervisor, &id).await;

    assert_eq!(session.status, RunStatus::Completed);
    let result = session.result.unwrap();
    assert_eq!(result.domain.fallback_steps().len(), 4);
    assert!(result.domain.life_expectancy.provenance.is_fallback());
    assert!(result.total_economic_loss > 0.0);
}

#[tokio::test]
async fn test_slow_provider_times_out_to_fallbacks() {
    let config = PipelineConfig::default().with_provider_timeout(Duration::from_millis(20));
    let supervisor = Supervisor::new(Arc::new(SessionStore::new()), Arc::new(SlowProvider), config);

    let started = std::time::Instant::now();
    let session = supervisor.run_to_completion(john_doe()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(session.status, RunStatus::Completed);
    let result = session.result.unwrap();
    assert_eq!(result.domain.discount_rate(), PipelineConfig::default().fallback_discount_rate);
    assert!(result.domain.wage_growth.provenance.description.contains("did not answer"));
}

#[tokio::test]
async fn test_zero_prior_wage_uses_fallback_rate() {
    let supervisor = Supervisor::new(Arc::new(SessionStore::new()), reference_data(), PipelineConfig::default());
    let person = PersonRecord {
        name: "Robert Hale".to_string(),
        occupation: "Truck Driver".to_string(),
        home_county: String::new(),
        home_state: String::new(),
        ..john_doe()
    };

    let session = supervisor.run_to_completion(person).await.unwrap();
    assert_eq!(session.status, RunStatus::Completed);

    let result = session.result.unwrap();
    assert_eq!(result.domain.wage_growth_rate(), PipelineConfig::default().fallback_wage_growth_rate);
    assert_eq!(result.domain.fallback_steps(), vec!["Wage Growth".to_string()]);
}

#[tokio::test]
async fn test_invalid_person_ends_in_error() {
    let supervisor = Supervisor::new(Arc::new(SessionStore::new()), reference_data(), PipelineConfig::default());
    let person = PersonRecord {
        dod: NaiveDate::from_ymd_opt(1979, 1, 1).unwrap(),
        annual_salary: 0.0,
        ..john_doe()
    };

    let id = supervisor.start_run(person).unwrap();
    let session = observe_until_done(&supervisor, &id).await;

    assert_eq!(session.status, RunStatus::Error);
    assert!(session.result.is_none());
    assert_eq!(session.errors.len(), 1);
    assert!(session.errors[0].starts_with("ValidationError"));
}
