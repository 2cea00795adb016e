// src/process/extract.rs
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::error::ExtractError;

fn open_archive(zip_path: &Path) -> Result<ZipArchive<File>, ExtractError> {
    let file = File::open(zip_path).map_err(|source| ExtractError::Open {
        path: zip_path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ExtractError::Zip {
        path: zip_path.to_path_buf(),
        source,
    })
}

/// Index and name of every file entry whose lowercased name ends in `.csv`, in archive order.
fn csv_entries(
    archive: &mut ZipArchive<File>,
    zip_path: &Path,
) -> Result<Vec<(usize, String)>, ExtractError> {
    let mut found = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|source| ExtractError::Zip {
            path: zip_path.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();
        info!(entry = %name, "archive entry");

        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            found.push((i, name));
        }
    }
    Ok(found)
}

/// Names of the CSV entries in `zip_path`, in archive order.
pub fn list_csv_entries<P: AsRef<Path>>(zip_path: P) -> Result<Vec<String>, ExtractError> {
    let zip_path = zip_path.as_ref();
    let mut archive = open_archive(zip_path)?;
    Ok(csv_entries(&mut archive, zip_path)?
        .into_iter()
        .map(|(_, name)| name)
        .collect())
}

/// Extract the first `.csv` entry of `zip_path` into `dest_dir` and return where it landed.
///
/// Only that one entry is written. With several CSV entries the first in
/// archive order wins; with none, nothing is written and
/// [`ExtractError::NoCsvEntry`] is returned.
#[instrument(level = "info", skip(zip_path, dest_dir), fields(zip = %zip_path.as_ref().display()))]
pub fn extract_first_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    zip_path: P,
    dest_dir: Q,
) -> Result<PathBuf, ExtractError> {
    let zip_path = zip_path.as_ref();
    let dest_dir = dest_dir.as_ref();
    let mut archive = open_archive(zip_path)?;

    let candidates = csv_entries(&mut archive, zip_path)?;
    let (index, name) = candidates
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::NoCsvEntry(zip_path.to_path_buf()))?;

    let mut entry = archive.by_index(index).map_err(|source| ExtractError::Zip {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let relative = entry
        .enclosed_name()
        .ok_or_else(|| ExtractError::UnsafeEntryName(name.clone()))?;
    let out_path = dest_dir.join(relative);

    let write_err = |source| ExtractError::Write {
        path: out_path.clone(),
        source,
    };
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut out = File::create(&out_path).map_err(write_err)?;
    let written = io::copy(&mut entry, &mut out).map_err(write_err)?;
    debug!(bytes = written, "copied entry");

    info!(entry = %name, path = %out_path.display(), "extracted");
    Ok(out_path)
}
