// src/config.rs
use anyhow::{Context, Result};
use std::{env, path::PathBuf, time::Duration};

/// NCSBE absentee file for the 2024-11-05 general election.
pub const DEFAULT_SOURCE_URL: &str = "https://dl.ncsbe.gov/ENRS/2024_11_05/absentee_20241105.zip";
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_OUTPUT_PATH: &str = "aggregated_absentee_summary.csv";
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(2);

pub const STATUS_COLUMN: &str = "ballot_rtn_status";
pub const ACCEPTED_STATUS: &str = "ACCEPTED";

/// Columns that make up a summary group, in output order.
pub static GROUP_COLUMNS: &[&str] = &[
    "county_desc",
    "race",
    "ethnicity",
    "gender",
    "age",
    "voter_party_code",
    "cong_dist_desc",
    "nc_house_desc",
    "nc_senate_desc",
    "ballot_req_delivery_type",
    "ballot_req_type",
    "ballot_req_dt",
    "ballot_send_dt",
    "ballot_rtn_dt",
    "ballot_rtn_status",
];

const ENV_URL: &str = "NCABSENTEE_URL";
const ENV_DOWNLOAD_DIR: &str = "NCABSENTEE_DOWNLOAD_DIR";
const ENV_OUTPUT: &str = "NCABSENTEE_OUTPUT";
const ENV_RATE_LIMIT_SECS: &str = "NCABSENTEE_RATE_LIMIT_SECS";

/// Everything one run needs. Built once in `main` and handed to each stage by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source_url: String,
    pub download_dir: PathBuf,
    pub output_path: PathBuf,
    /// Flat pause after the download, whatever the response was.
    pub rate_limit: Duration,
    pub group_columns: Vec<String>,
    pub status_column: String,
    pub accepted_status: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            rate_limit: DEFAULT_RATE_LIMIT,
            group_columns: GROUP_COLUMNS.iter().map(|c| c.to_string()).collect(),
            status_column: STATUS_COLUMN.to_string(),
            accepted_status: ACCEPTED_STATUS.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, with the source URL, directories and delay overridable from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(url) = lookup(ENV_URL) {
            cfg.source_url = url;
        }
        if let Some(dir) = lookup(ENV_DOWNLOAD_DIR) {
            cfg.download_dir = PathBuf::from(dir);
        }
        if let Some(out) = lookup(ENV_OUTPUT) {
            cfg.output_path = PathBuf::from(out);
        }
        if let Some(secs) = lookup(ENV_RATE_LIMIT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("parsing {}={:?}", ENV_RATE_LIMIT_SECS, secs))?;
            cfg.rate_limit = Duration::from_secs(secs);
        }

        Ok(cfg)
    }
}
