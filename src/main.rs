use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use txguard::cases::types::FlaggedCase;
use txguard::config::Config;
use txguard::ingest::loader;
use txguard::ingest::types::Transaction;
use txguard::narrative::{NarrativeGenerator, TemplateNarrative};
use txguard::pipeline::{AnalysisPipeline, RunSummary};

#[derive(Serialize)]
struct RunOutput<'a> {
    summary: RunSummary,
    cases: &'a [FlaggedCase],
    narratives: Vec<String>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("TxGuard starting");

    // Load configuration; defaults apply only when no path was given
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let config = Config::load(&path)?;
            tracing::info!("Configuration loaded from {}", path);
            config
        }
        None => {
            tracing::info!("No config file given, using defaults");
            Config::default()
        }
    };

    let transactions_path = std::env::args()
        .nth(2)
        .or_else(|| config.input.transactions_path.clone())
        .ok_or_else(|| {
            eyre::eyre!("No transactions file: pass it as the second argument or set input.transactions_path")
        })?;

    let (transactions, load_stats) = loader::load_csv(&transactions_path)?;
    let transactions: Arc<[Transaction]> = transactions.into();

    let pipeline = AnalysisPipeline::new(&config)?;
    let report = pipeline.run(Arc::clone(&transactions)).await?;

    if let Err(e) = &report.anomaly {
        tracing::warn!(error = %e, "Anomaly detection skipped for this batch");
    }

    let by_id: HashMap<u64, &Transaction> = transactions.iter().map(|t| (t.id, t)).collect();
    let narrator = TemplateNarrative::new(chrono::Utc::now());
    let narratives: Vec<String> = report
        .cases
        .iter()
        .take(config.narrative.max_reports)
        .map(|case| narrator.generate(case, by_id.get(&case.transaction_id).copied()))
        .collect();

    let output = RunOutput {
        summary: report.summary().with_load_stats(&load_stats),
        cases: &report.cases,
        narratives,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("TxGuard finished");
    Ok(())
}
