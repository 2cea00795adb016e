// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Failures while pulling the CSV entry out of a downloaded archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open archive {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read ZIP archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("no .csv file found in the ZIP archive {0:?}")]
    NoCsvEntry(PathBuf),

    #[error("refusing to extract entry with unsafe name {0:?}")]
    UnsafeEntryName(String),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures while loading an extracted CSV into a [`RecordTable`].
///
/// [`RecordTable`]: crate::process::table::RecordTable
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0:?} is empty (no header row)")]
    EmptyInput(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {path:?}: {source}")]
    Malformed { path: PathBuf, source: csv::Error },

    #[error("malformed CSV in {path:?}: expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("malformed CSV in {path:?}: EOF inside quoted field starting in line {line}")]
    UnterminatedQuote { path: PathBuf, line: u64 },
}

/// Failures while counting and grouping records.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("column {0:?} not present in record table")]
    MissingColumn(String),

    #[error("failed to write summary {path:?}: {source}")]
    Write { path: PathBuf, source: csv::Error },

    #[error("failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
