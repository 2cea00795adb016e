// src/fetch/mod.rs
use anyhow::{Context, Result};
use url::Url;

pub mod zips;

/// Name used when the URL path ends in `/` or has no segments.
const FALLBACK_FILE_NAME: &str = "download.zip";

/// Local file name for a downloaded archive: the last path segment of `url_str`.
pub fn archive_file_name(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str).with_context(|| format!("parsing source URL {}", url_str))?;
    Ok(url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string())
}
