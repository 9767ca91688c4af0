//! Input archival.
//!
//! Processed input files are gzip-compressed into a dated folder
//! (`<archive_dir>/YYYYMMDD/<stem>_<YYYYmmdd_HHMMSS>.<ext>.gz`) and the
//! original is removed.

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ArchiveError;

/// Archive location for `input` at time `now`
pub fn archive_path(input: &Path, archive_dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let name = match input.extension() {
        Some(ext) => format!(
            "{}_{}.{}.gz",
            stem,
            now.format("%Y%m%d_%H%M%S"),
            ext.to_string_lossy()
        ),
        None => format!("{}_{}.gz", stem, now.format("%Y%m%d_%H%M%S")),
    };
    archive_dir.join(now.format("%Y%m%d").to_string()).join(name)
}

/// Compress one file into the archive and delete the original
pub fn archive_file(input: &Path, archive_dir: &Path, now: DateTime<Local>) -> Result<PathBuf, ArchiveError> {
    if !input.is_file() {
        return Err(ArchiveError::Missing(input.to_path_buf()));
    }
    let target = archive_path(input, archive_dir, now);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let mut reader = BufReader::new(File::open(input).map_err(io_err(input))?);
    let writer = BufWriter::new(File::create(&target).map_err(io_err(&target))?);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    io::copy(&mut reader, &mut encoder).map_err(io_err(&target))?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(io_err(&target))?;

    fs::remove_file(input).map_err(io_err(input))?;
    Ok(target)
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { path, source }
}

/// Archive every input; failures are logged and skipped. Returns the archived targets.
pub fn archive_all(inputs: &[PathBuf], archive_dir: &Path, now: DateTime<Local>) -> Vec<PathBuf> {
    let mut archived = Vec::with_capacity(inputs.len());
    for input in inputs {
        match archive_file(input, archive_dir, now) {
            Ok(target) => archived.push(target),
            Err(err) => warn!(error = %err, "Failed to archive input"),
        }
    }
    info!(
        archived = archived.len(),
        failed = inputs.len() - archived.len(),
        dir = %archive_dir.display(),
        "Archived inputs"
    );
    archived
}
