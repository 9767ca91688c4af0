//! Error types, one enum per pipeline concern.

use std::path::PathBuf;
use thiserror::Error;

/// Source-level failure while reading one bookmaker file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("unsupported layout in {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(PathBuf),

    #[error("duplicate source '{source_id}' from {path} (already loaded)")]
    DuplicateSource { source_id: String, path: PathBuf },
}

/// Source-level failure while mapping a dataset onto the canonical schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("{source_id}: missing required columns {missing:?}")]
    MissingColumns {
        source_id: String,
        missing: Vec<&'static str>,
    },

    #[error("{source_id}: no valid rows after cleaning ({input_rows} rows in input)")]
    NoValidRows { source_id: String, input_rows: usize },
}

/// Rejection from the stake allocator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StakeError {
    #[error("non-positive odds for outcome {outcome}: {odds}")]
    NonPositiveOdds { outcome: &'static str, odds: f64 },

    #[error("total stake must be positive, got {0}")]
    InvalidStake(f64),
}

/// Failure writing the sure-bet report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure archiving one processed input
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("nothing to archive at {0}")]
    Missing(PathBuf),

    #[error("archive I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid scanner configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("fuzzy threshold must be within 0..=100, got {0}")]
    InvalidThreshold(u32),

    #[error("total stake must be positive and finite, got {0}")]
    InvalidStake(f64),

    #[error("odds bounds must satisfy 0 < min < max, got min={min} max={max}")]
    InvalidOddsBounds { min: f64, max: f64 },

    #[error("load workers must be at least 1")]
    NoWorkers,

    #[error("at least one source directory is required")]
    NoSourceDirs,
}
