//! Run economic loss analyses for every case in a CSV file
//!
//! All cases are started at once and share one session store; the batch
//! waits until every session is terminal, then writes one summary row per case.

use anyhow::{anyhow, Result};
use clap::Parser;
use forensic_economics::person::load_persons;
use forensic_economics::reference::DEFAULT_REFERENCE_PATH;
use forensic_economics::{
    CsvReferenceData, FileReportGenerator, PipelineConfig, ReferenceDataProvider, RunStatus, SessionStore,
    Supervisor, UnavailableReferenceData,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "run_batch")]
#[command(about = "Run loss analyses for a batch of cases", long_about = None)]
struct Cli {
    /// Cases CSV (one person per row)
    #[arg(default_value = "data/cases/cases.csv")]
    cases: PathBuf,

    #[arg(long, default_value = DEFAULT_REFERENCE_PATH)]
    reference_dir: PathBuf,

    /// Use built-in fallbacks only
    #[arg(long)]
    offline: bool,

    /// Pipeline configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-case reports are written here when set
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Batch summary output
    #[arg(short, long, default_value = "batch_summary.csv")]
    output: PathBuf,
}

#[derive(Serialize)]
struct BatchRow {
    session_id: String,
    name: String,
    status: RunStatus,
    age_at_death: u32,
    years_projected: Option<u32>,
    wage_growth_rate: Option<f64>,
    discount_rate: Option<f64>,
    total_economic_loss: Option<f64>,
    fallback_steps: String,
    errors: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let start = Instant::now();
    println!("Loading cases from {}...", cli.cases.display());
    let persons = load_persons(&cli.cases).map_err(|e| anyhow!("failed to load cases: {}", e))?;
    println!("Loaded {} cases in {:?}", persons.len(), start.elapsed());

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_path(path).map_err(|e| anyhow!("failed to load config: {}", e))?,
        None => PipelineConfig::default(),
    };

    let provider: Arc<dyn ReferenceDataProvider> = if cli.offline {
        Arc::new(UnavailableReferenceData)
    } else {
        Arc::new(
            CsvReferenceData::from_csv_path(&cli.reference_dir)
                .map_err(|e| anyhow!("failed to load reference data: {}", e))?,
        )
    };

    let store = Arc::new(SessionStore::new());
    let mut supervisor = Supervisor::new(store.clone(), provider, config);
    if let Some(dir) = &cli.report_dir {
        supervisor = supervisor.with_reporter(Arc::new(FileReportGenerator::new(dir)));
    }

    println!("Running analyses...");
    let run_start = Instant::now();
    let ids = persons
        .into_iter()
        .map(|person| supervisor.start_run(person))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sessions = Vec::with_capacity(ids.len());
    for id in &ids {
        sessions.push(supervisor.wait_for(id, Duration::from_millis(25)).await?);
    }
    println!("Analyses complete in {:?}", run_start.elapsed());

    let mut writer = csv::Writer::from_path(&cli.output)?;
    let mut completed = 0;
    let mut total_loss = 0.0;
    for session in &sessions {
        let summary = session.result.as_ref().map(|r| r.summary(&session.person));
        if session.status == RunStatus::Completed {
            completed += 1;
            total_loss += session.total_economic_loss().unwrap_or(0.0);
        }
        writer.serialize(BatchRow {
            session_id: session.id.to_string(),
            name: session.person.name.clone(),
            status: session.status,
            age_at_death: session.person.age_at_death(),
            years_projected: summary.as_ref().map(|s| s.years_projected),
            wage_growth_rate: summary.as_ref().map(|s| s.wage_growth_rate),
            discount_rate: summary.as_ref().map(|s| s.discount_rate),
            total_economic_loss: summary.as_ref().map(|s| s.total_economic_loss),
            fallback_steps: summary.map(|s| s.fallback_steps.join("; ")).unwrap_or_default(),
            errors: session.errors.join("; "),
        })?;
    }
    writer.flush()?;

    println!("\nBatch Summary:");
    println!("  Cases:            {}", sessions.len());
    println!("  Completed:        {}", completed);
    println!("  Failed:           {}", sessions.len() - completed);
    println!("  Total loss (PV):  ${:.2}", total_loss);
    println!("  Written to {}", cli.output.display());
    println!("\nTotal time: {:?}", start.elapsed());

    Ok(())
}
