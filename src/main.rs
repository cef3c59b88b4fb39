//! Forensic Economics CLI
//!
//! Runs one economic loss analysis, printing step progress while it runs and
//! the loss summary and timeline when it finishes.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use forensic_economics::person::{load_person_json, EducationLevel, EmploymentStatus, Sex};
use forensic_economics::reference::DEFAULT_REFERENCE_PATH;
use forensic_economics::session::PipelineStep;
use forensic_economics::{
    CsvReferenceData, FileReportGenerator, PersonRecord, PipelineConfig, ReferenceDataProvider, RunStatus,
    SessionStore, Supervisor, UnavailableReferenceData,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "forensic_economics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Present-value economic loss analysis for a wrongful-death case", long_about = None)]
struct Cli {
    /// Person record (JSON); the built-in example case when omitted
    #[arg(short, long)]
    person: Option<PathBuf>,

    /// Directory of reference CSV tables
    #[arg(long, default_value = DEFAULT_REFERENCE_PATH)]
    reference_dir: PathBuf,

    /// Skip reference data and use built-in fallbacks only
    #[arg(long)]
    offline: bool,

    /// Pipeline configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the per-lookup provider timeout (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Let work-life expectancy exceed remaining life expectancy
    #[arg(long)]
    no_cap: bool,

    /// Write timeline CSV and summary JSON here
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Progress polling interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn example_person() -> Result<PersonRecord> {
    Ok(PersonRecord {
        name: "John Doe".to_string(),
        dob: NaiveDate::from_ymd_opt(1980, 1, 15).context("invalid date of birth")?,
        dod: NaiveDate::from_ymd_opt(2024, 3, 20).context("invalid date of death")?,
        occupation: "Software Engineer".to_string(),
        annual_salary: 120_000.0,
        sex: Sex::Male,
        education_level: EducationLevel::Bachelors,
        home_county: "Los Angeles".to_string(),
        home_state: "California".to_string(),
        status: EmploymentStatus::Active,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Forensic Economics v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let person = match &cli.person {
        Some(path) => load_person_json(path).map_err(|e| anyhow!("failed to load {}: {}", path.display(), e))?,
        None => example_person()?,
    };

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_path(path)
            .map_err(|e| anyhow!("failed to load config {}: {}", path.display(), e))?,
        None => PipelineConfig::default(),
    };
    if let Some(ms) = cli.timeout_ms {
        config = config.with_provider_timeout(Duration::from_millis(ms));
    }
    if cli.no_cap {
        config.cap_work_life_at_life_expectancy = false;
    }

    let provider: Arc<dyn ReferenceDataProvider> = if cli.offline {
        Arc::new(UnavailableReferenceData)
    } else {
        Arc::new(
            CsvReferenceData::from_csv_path(&cli.reference_dir)
                .map_err(|e| anyhow!("failed to load reference data: {}", e))?,
        )
    };

    println!("Person: {}", person.name);
    println!("  Age at death: {}", person.age_at_death());
    println!("  Occupation: {}", person.occupation);
    println!("  Annual salary: ${:.2}", person.annual_salary);
    println!("  Reference data: {}", provider.name());
    println!();

    let mut supervisor = Supervisor::new(Arc::new(SessionStore::new()), provider, config);
    if let Some(dir) = &cli.output_dir {
        supervisor = supervisor.with_reporter(Arc::new(FileReportGenerator::new(dir)));
    }

    let id = supervisor.start_run(person.clone())?;
    println!("Session {}", id);

    let interval = Duration::from_millis(cli.poll_ms.max(1));
    let mut seen: Vec<Option<RunStatus>> = vec![None; PipelineStep::ALL.len()];
    let session = loop {
        let session = supervisor.get_progress(&id)?;
        for (index, step) in session.steps.iter().enumerate() {
            if step.status != RunStatus::Pending && seen[index] != Some(step.status) {
                seen[index] = Some(step.status);
                println!("  [{:<11}] {:<26} {}", step.status, step.step.label(), step.message);
            }
        }
        if session.is_terminal() {
            break session;
        }
        tokio::time::sleep(interval).await;
    };
    println!();

    let (completed, total) = session.progress();
    println!("Status: {} ({}/{} steps)", session.status, completed, total);
    for message in &session.errors {
        println!("  error: {}", message);
    }

    let Some(result) = &session.result else {
        bail!("analysis {} failed without a result", id);
    };

    let summary = result.summary(&person);
    println!("\nSummary:");
    println!("  Remaining life expectancy: {:.2} years", summary.remaining_life_expectancy);
    println!("  Total expected lifespan:   {:.2} years", summary.total_expected_lifespan);
    println!("  Work-life expectancy:      {:.2} years", summary.work_life_expectancy);
    println!("  Wage growth rate:          {:.2}%", summary.wage_growth_rate * 100.0);
    println!("  Discount rate:             {:.2}%", summary.discount_rate * 100.0);
    println!("  Years projected:           {}", summary.years_projected);
    println!("  Total projected earnings:  ${:.2}", summary.total_projected_earnings);
    println!("  Total economic loss (PV):  ${:.2}", summary.total_economic_loss);
    if !summary.fallback_steps.is_empty() {
        println!("  Fallback data used for:    {}", summary.fallback_steps.join(", "));
    }

    println!("\nTimeline:");
    println!(
        "{:>6} {:>4} {:>14} {:>10} {:>14} {:>16}",
        "Year", "Age", "Earnings", "DiscFac", "PV", "Cumulative PV"
    );
    println!("{}", "-".repeat(69));
    for entry in &result.timeline {
        println!(
            "{:>6} {:>4} {:>14.2} {:>10.6} {:>14.2} {:>16.2}",
            entry.year,
            entry.age,
            entry.projected_earnings,
            entry.discount_factor,
            entry.present_value,
            entry.cumulative_present_value
        );
    }

    for artifact in &session.artifacts {
        println!("\nWrote {}", artifact);
    }

    if session.status != RunStatus::Completed {
        bail!("analysis {} ended in {}", id, session.status);
    }
    Ok(())
}
