use anyhow::{Context, Result};
use reqwest::Client;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{fs, time::sleep};
use tracing::{info, instrument, warn};

use super::archive_file_name;

/// Download `url_str` into `dest_dir` under its original filename, then pause for `delay`.
///
/// The body is written whatever the status code; a bad response shows up later
/// when the file fails to open as a ZIP. Returns the full path of the saved file.
#[instrument(level = "info", skip(client, dest_dir), fields(dest = %dest_dir.as_ref().display()))]
pub async fn download_zip(
    client: &Client,
    url_str: &str,
    dest_dir: impl AsRef<Path>,
    delay: Duration,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let dest_path = dest_dir.join(archive_file_name(url_str)?);

    fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating download directory {:?}", dest_dir))?;

    info!(url = %url_str, "downloading absentee file");
    let resp = client
        .get(url_str)
        .send()
        .await
        .with_context(|| format!("GET {}", url_str))?;
    let status = resp.status();
    if !status.is_success() {
        warn!(url = %url_str, %status, "non-success response; saving body anyway");
    }
    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("reading body from {}", url_str))?;

    fs::write(&dest_path, &bytes)
        .await
        .with_context(|| format!("writing {:?}", dest_path))?;
    info!(path = %dest_path.display(), bytes = bytes.len(), "saved archive");

    sleep(delay).await;

    Ok(dest_path)
}
