// src/process/aggregate.rs
use csv::Writer;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::error::AggregateError;
use crate::process::table::RecordTable;

/// Name of the trailing count column in the summary file.
pub const COUNT_COLUMN: &str = "ballot_count";

/// Row counts keyed by the values of `key_columns`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub key_columns: Vec<String>,
    pub groups: BTreeMap<Vec<String>, u64>,
}

impl Summary {
    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of all group counts; equals the number of source rows.
    pub fn total(&self) -> u64 {
        self.groups.values().sum()
    }
}

/// What [`process_data`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub rows: usize,
    pub accepted: usize,
    pub groups: usize,
    pub output: PathBuf,
}

fn require_column(table: &RecordTable, name: &str) -> Result<usize, AggregateError> {
    table
        .column_index(name)
        .ok_or_else(|| AggregateError::MissingColumn(name.to_string()))
}

/// Count rows whose `column` is exactly `literal`.
pub fn count_status(
    table: &RecordTable,
    column: &str,
    literal: &str,
) -> Result<usize, AggregateError> {
    let idx = require_column(table, column)?;
    Ok(table
        .rows
        .iter()
        .filter(|row| row.get(idx).map(String::as_str) == Some(literal))
        .count())
}

/// Group rows by the exact values of `key_columns` and count each group.
///
/// Every key column must exist in the table. Values are compared as-is, so
/// `"Wake"` and `"WAKE"` are different groups and an empty cell is a key like any other.
pub fn group_counts<S: AsRef<str>>(
    table: &RecordTable,
    key_columns: &[S],
) -> Result<Summary, AggregateError> {
    let indices = key_columns
        .iter()
        .map(|c| require_column(table, c.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: BTreeMap<Vec<String>, u64> = BTreeMap::new();
    for row in &table.rows {
        let key: Vec<String> = indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or_default())
            .collect();
        *groups.entry(key).or_insert(0) += 1;
    }

    Ok(Summary {
        key_columns: key_columns.iter().map(|c| c.as_ref().to_string()).collect(),
        groups,
    })
}

/// Write `summary` as CSV: the key columns, then [`COUNT_COLUMN`], one row per group.
pub fn write_summary<P: AsRef<Path>>(summary: &Summary, path: P) -> Result<(), AggregateError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AggregateError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| AggregateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = Writer::from_path(path).map_err(write_err)?;
    let header = summary
        .key_columns
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(COUNT_COLUMN));
    wtr.write_record(header).map_err(write_err)?;

    for (key, count) in &summary.groups {
        let count = count.to_string();
        let record = key
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(count.as_str()));
        wtr.write_record(record).map_err(write_err)?;
    }
    wtr.flush().map_err(|e| write_err(e.into()))?;
    Ok(())
}

/// Log the accepted-ballot total, then group, count, and write the summary file.
#[instrument(level = "info", skip_all, fields(rows = table.len()))]
pub fn process_data(
    table: &RecordTable,
    config: &PipelineConfig,
) -> Result<SummaryReport, AggregateError> {
    let accepted = count_status(table, &config.status_column, &config.accepted_status)?;
    info!(
        accepted,
        status = %config.accepted_status,
        "total ballots with accepted return status"
    );

    let summary = group_counts(table, &config.group_columns)?;
    write_summary(&summary, &config.output_path)?;
    info!(
        groups = summary.len(),
        path = %config.output_path.display(),
        "aggregated data saved"
    );

    Ok(SummaryReport {
        rows: table.len(),
        accepted,
        groups: summary.len(),
        output: config.output_path.clone(),
    })
}
