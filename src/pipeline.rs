// src/pipeline.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{error, info, instrument};

use crate::{
    config::PipelineConfig,
    fetch,
    process::{self, SummaryReport},
};

/// How a run ended when nothing aborted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Summary file written.
    Written(SummaryReport),
    /// The CSV had a header but no records; nothing written.
    NoRecords { csv: PathBuf },
    /// The CSV could not be parsed; logged, nothing written.
    ParseFailed { csv: PathBuf, reason: String },
}

/// Download the configured archive, then aggregate it.
#[instrument(level = "info", skip_all, fields(url = %config.source_url))]
pub async fn run(client: &Client, config: &PipelineConfig) -> Result<RunOutcome> {
    let zip_path = fetch::zips::download_zip(
        client,
        &config.source_url,
        &config.download_dir,
        config.rate_limit,
    )
    .await?;
    run_from_archive(&zip_path, config).await
}

/// Extract, parse and aggregate an archive that is already on disk.
///
/// Extraction and aggregation failures are returned as errors. A parse
/// failure is logged and reported as [`RunOutcome::ParseFailed`].
pub async fn run_from_archive(zip_path: &Path, config: &PipelineConfig) -> Result<RunOutcome> {
    // ─── extract ────────────────────────────────────────────────────
    let csv_path = task::spawn_blocking({
        let zip_path = zip_path.to_path_buf();
        let dest = config.download_dir.clone();
        move || process::extract_first_csv(&zip_path, &dest)
    })
    .await?
    .with_context(|| format!("extracting CSV from {}", zip_path.display()))?;

    // ─── parse ──────────────────────────────────────────────────────
    let parsed = task::spawn_blocking({
        let csv_path = csv_path.clone();
        move || process::parse_absentee_file(&csv_path)
    })
    .await?;
    let table = match parsed {
        Ok(table) => table,
        Err(e) => {
            error!(csv = %csv_path.display(), "failed to parse file: {}", e);
            return Ok(RunOutcome::ParseFailed {
                csv: csv_path,
                reason: e.to_string(),
            });
        }
    };
    if table.is_empty() {
        info!(csv = %csv_path.display(), "no records; skipping aggregation");
        return Ok(RunOutcome::NoRecords { csv: csv_path });
    }

    // ─── aggregate ──────────────────────────────────────────────────
    let report = task::spawn_blocking({
        let config = config.clone();
        move || process::process_data(&table, &config)
    })
    .await?
    .context("aggregating absentee records")?;

    Ok(RunOutcome::Written(report))
}
