//! Source loader.
//!
//! Discovers bookmaker files in the configured directories and reads them
//! concurrently on a bounded rayon pool. Each file becomes one
//! [`BookmakerDataset`]. JSON, JSON lines and spreadsheet workbooks (first
//! sheet, header row) are understood; a file that cannot be read is recorded as a
//! failure and the rest of the run continues.

use calamine::{open_workbook_auto, Data, Reader};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::error::LoadError;
use crate::types::{BookmakerDataset, RawRow, SourceId};

/// Extensions the loader understands
pub const SUPPORTED_EXTENSIONS: &[&str] = &["json", "jsonl", "ndjson", "xlsx", "xls", "ods"];

/// Suffix given to a repeated column name in the split layout or a sheet header
const DUPLICATE_COLUMN_SUFFIX: &str = "_duplicate";

/// Everything the loader produced for one run
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded datasets keyed by source id
    pub datasets: BTreeMap<SourceId, BookmakerDataset>,
    /// Files that could not be loaded
    pub failures: Vec<(PathBuf, LoadError)>,
    /// Source ids skipped by the exclusion list
    pub excluded: Vec<SourceId>,
}

impl LoadReport {
    /// Paths of every dataset that loaded, in source-id order
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.datasets.values().map(|ds| ds.path.clone()).collect()
    }
}

/// Source id for a file: its stem
pub fn source_id(path: &Path) -> Option<SourceId> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// List supported files in each directory (non-recursive), sorted by path
pub fn discover_sources(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for dir in dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read source directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true);
            if hidden {
                continue;
            }
            if has_supported_extension(&path) {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "Skipping unsupported file");
            }
        }
    }

    paths.sort();
    paths
}

fn has_supported_extension(path: &Path) -> bool {
    extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Load every path on a pool of `config.load_workers` threads
pub fn load_sources(paths: &[PathBuf], config: &ScannerConfig) -> LoadReport {
    let mut report = LoadReport::default();

    let mut to_load: Vec<&PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        match source_id(path) {
            Some(id) if config.is_excluded(&id) => {
                info!(source = id.as_str(), "Skipping excluded source");
                report.excluded.push(id);
            }
            _ => to_load.push(path),
        }
    }

    let read_all = || -> Vec<Result<BookmakerDataset, LoadError>> {
        to_load.par_iter().map(|path| load_file(path)).collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.load_workers)
        .build()
    {
        Ok(pool) => pool.install(read_all),
        Err(e) => {
            warn!(error = %e, "Failed to build loader pool, using global pool");
            read_all()
        }
    };

    // Fold in path order so the first file for a source id wins
    for (path, result) in to_load.into_iter().zip(results) {
        match result {
            Ok(dataset) => {
                if report.datasets.contains_key(&dataset.source) {
                    let err = LoadError::DuplicateSource {
                        source_id: dataset.source.clone(),
                        path: path.clone(),
                    };
                    warn!(error = %err, "Ignoring duplicate source");
                    report.failures.push((path.clone(), err));
                    continue;
                }
                debug!(
                    source = dataset.source.as_str(),
                    rows = dataset.len(),
                    columns = dataset.columns.len(),
                    "Loaded source"
                );
                report.datasets.insert(dataset.source.clone(), dataset);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to load source");
                report.failures.push((path.clone(), err));
            }
        }
    }

    info!(
        loaded = report.datasets.len(),
        failed = report.failures.len(),
        excluded = report.excluded.len(),
        "Source loading complete"
    );
    report
}

/// Read one file into a dataset
pub fn load_file(path: &Path) -> Result<BookmakerDataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let source = source_id(path).ok_or_else(|| LoadError::InvalidLayout {
        path: path.to_path_buf(),
        reason: "file name is not valid UTF-8".to_string(),
    })?;

    let rows = match extension(path).as_deref() {
        Some("json") => parse_json(path, &read(path)?)?,
        Some("jsonl") | Some("ndjson") => parse_json_lines(path, &read(path)?)?,
        Some("xlsx") | Some("xls") | Some("ods") => parse_workbook(path)?,
        _ => return Err(LoadError::UnsupportedExtension(path.to_path_buf())),
    };

    Ok(BookmakerDataset::new(source, path, rows))
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidLayout {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// `records` (array of objects) or `split` (`{"columns": [..], "data": [[..]]}`)
fn parse_json(path: &Path, content: &str) -> Result<Vec<RawRow>, LoadError> {
    let value: Value = serde_json::from_str(content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(invalid(path, format!("record {i} is not an object"))),
            })
            .collect(),
        Value::Object(mut obj) => {
            let columns = match obj.remove("columns") {
                Some(Value::Array(cols)) => split_columns(path, cols)?,
                _ => return Err(invalid(path, "expected a records array or a columns/data object")),
            };
            let data = match obj.remove("data") {
                Some(Value::Array(data)) => data,
                _ => return Err(invalid(path, "split layout is missing a data array")),
            };
            data.into_iter()
                .enumerate()
                .map(|(i, row)| match row {
                    Value::Array(cells) if cells.len() == columns.len() => {
                        Ok(columns.iter().cloned().zip(cells).collect::<Map<_, _>>())
                    }
                    Value::Array(cells) => Err(invalid(
                        path,
                        format!("row {i} has {} cells, expected {}", cells.len(), columns.len()),
                    )),
                    _ => Err(invalid(path, format!("row {i} is not an array"))),
                })
                .collect()
        }
        _ => Err(invalid(path, "top-level value must be an array or object")),
    }
}

/// Column names for the split layout; repeats get a `_duplicate` suffix
fn split_columns(path: &Path, cols: Vec<Value>) -> Result<Vec<String>, LoadError> {
    let mut names: Vec<String> = Vec::with_capacity(cols.len());
    for (i, col) in cols.into_iter().enumerate() {
        let name = match col {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return Err(invalid(path, format!("column {i} has no usable name"))),
        };
        push_column(&mut names, name);
    }
    Ok(names)
}

fn push_column(names: &mut Vec<String>, mut name: String) {
    while names.contains(&name) {
        name.push_str(DUPLICATE_COLUMN_SUFFIX);
    }
    names.push(name);
}

/// First worksheet; the first row is the header, fully empty rows are skipped
fn parse_workbook(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let workbook_err = |source: calamine::Error| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| invalid(path, "workbook has no sheets"))?
        .map_err(workbook_err)?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(Vec::new()),
    };
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (i, cell) in header.iter().enumerate() {
        let name = match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => format!("{f}"),
            Data::Int(n) => n.to_string(),
            Data::Empty => format!("column_{i}"),
            other => return Err(invalid(path, format!("column {i} has no usable name: {other}"))),
        };
        push_column(&mut columns, name);
    }

    Ok(rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            columns
                .iter()
                .cloned()
                .zip(cells.iter().map(cell_value))
                .collect::<Map<_, _>>()
        })
        .collect())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(n) => Value::from(*n),
        Data::Float(f) => Value::from(*f),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::from(s.as_str()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|t| Value::from(t.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or_else(|| Value::from(dt.as_f64())),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

fn parse_json_lines(path: &Path, content: &str) -> Result<Vec<RawRow>, LoadError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            match value {
                Value::Object(row) => Ok(row),
                _ => Err(invalid(path, format!("line {} is not an object", i + 1))),
            }
        })
        .collect()
}
