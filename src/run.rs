//! `run` and `file` commands.
//!
//! Wires the Drive client, the orchestrator and the output directory
//! together, then prints a summary on stdout. Per-file diagnostics go
//! through `tracing` on stderr.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::drive::DriveClient;
use crate::formats::{fetch_plan, Category};
use crate::models::{ExtractionOutcome, OutcomeStatus, RunReport};
use crate::orchestrator::ExtractionOrchestrator;
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::traits::{ExtractorRegistry, FileLister};

/// List every matching Drive file and extract it.
pub async fn run_extract(
    config: &Config,
    limit: Option<usize>,
    dry_run: bool,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let client = Arc::new(DriveClient::from_config(&config.drive)?);
    let reporter: Arc<dyn ProgressReporter> = Arc::from(progress.reporter());

    reporter.report(ProgressEvent::Listing);
    let mut files = client.list_files().await?;
    if let Some(lim) = limit {
        files.truncate(lim);
    }
    info!(files = files.len(), "listed drive files");

    if dry_run {
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        for file in &files {
            let key = Category::from_mime(&file.mime_type)
                .map(|c| c.dir_name().to_string())
                .unwrap_or_else(|| "unsupported".to_string());
            *by_category.entry(key).or_default() += 1;
        }
        println!("run (dry-run)");
        println!("  files found: {}", files.len());
        for (category, count) in &by_category {
            println!("  {}: {}", category, count);
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = spawn_ctrl_c(cancel.clone());

    let orchestrator =
        ExtractionOrchestrator::from_config(client, config).with_progress(reporter);
    let report = orchestrator.run_batch(files, cancel).await;
    ctrl_c.abort();

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", out);
    } else {
        print_report(&report, orchestrator.writer().base_dir().display());
    }

    if report.cancelled {
        bail!(
            "run cancelled: {} of {} files abandoned",
            report.abandoned(),
            report.planned
        );
    }
    Ok(())
}

/// Extract specific files by id.
pub async fn run_files(config: &Config, ids: &[String], json: bool) -> Result<()> {
    let client = Arc::new(DriveClient::from_config(&config.drive)?);
    let orchestrator = ExtractionOrchestrator::from_config(client, config);

    let mut outcomes = Vec::with_capacity(ids.len());
    for id in ids {
        outcomes.push(orchestrator.process_by_id(id).await);
    }

    if json {
        let out = serde_json::to_string_pretty(&outcomes).context("Failed to serialize outcomes")?;
        println!("{}", out);
    } else {
        for outcome in &outcomes {
            println!("{}", describe(outcome));
        }
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    if failed > 0 {
        bail!("{} of {} files failed", failed, outcomes.len());
    }
    Ok(())
}

/// Print the supported content types and where their text lands.
pub fn list_formats(registry: &ExtractorRegistry) {
    println!(
        "{:<72} {:<14} {:<22} OUTPUT",
        "MIME TYPE", "EXTRACTOR", "FETCH"
    );
    for mime in registry.mime_types() {
        if let Some(extractor) = registry.get_for_mime(mime) {
            let category = extractor.category();
            println!(
                "{:<72} {:<14} {:<22} {}/",
                mime,
                extractor.name(),
                fetch_plan(category).to_string(),
                category.dir_name()
            );
        }
    }
}

fn print_report(report: &RunReport, base_dir: impl std::fmt::Display) {
    println!("run");
    println!("  output: {}", base_dir);
    println!("  files: {}", report.planned);
    println!("  extracted: {}", report.succeeded());
    println!("  skipped: {}", report.skipped());
    println!("  failed: {}", report.failed());
    if report.cancelled {
        println!("  abandoned: {}", report.abandoned());
    }
    println!("  bytes written: {}", report.bytes_written());
    for outcome in report.outcomes.iter().filter(|o| o.is_failed()) {
        println!("  - {}", describe(outcome));
    }
    for (path, sources) in report.shared_artifacts() {
        println!("  ! {} overwritten by: {}", path.display(), sources.join(", "));
    }
    let elapsed = report.finished_at - report.started_at;
    println!("  elapsed: {}ms", elapsed.num_milliseconds());
    if !report.cancelled {
        println!("ok");
    }
}

fn describe(outcome: &ExtractionOutcome) -> String {
    let name = &outcome.source.name;
    match (&outcome.status, &outcome.artifact) {
        (OutcomeStatus::Success, Some(artifact)) => {
            format!("{}: extracted -> {}", name, artifact.path.display())
        }
        (OutcomeStatus::Success, None) => format!("{}: extracted", name),
        (OutcomeStatus::SkippedUnsupported { reason }, _) => {
            format!("{}: skipped ({})", name, reason)
        }
        (OutcomeStatus::Failed { stage, error }, _) => {
            format!("{}: failed at {}: {}", name, stage, error)
        }
    }
}

fn spawn_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    })
}
