//! Surebet Core - cross-bookmaker sure-bet detection and stake allocation.
//!
//! This module provides:
//! - Loading of per-bookmaker odds snapshots (JSON / JSON lines)
//! - Schema normalization with per-source column overrides and team aliases
//! - Token-set fuzzy matching of fixtures across bookmakers, batched via rayon
//! - Merging into one record per real-world event
//! - Best-price arbitrage evaluation for the 1/X/2 market
//! - Closed-form equal-profit stake allocation
//! - JSON report writing and gzip archival of processed inputs

pub mod arbitrage;
pub mod archive;
pub mod config;
pub mod error;
pub mod loader;
pub mod match_key;
pub mod matching;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stake;
mod types;

pub use config::{ScannerConfig, TeamAliases};
pub use error::{ArchiveError, ConfigError, LoadError, NormalizeError, ReportError, StakeError};
pub use match_key::MatchKey;
pub use pipeline::{analyze, run, Diagnostics, RunOutcome, RunResult, SourceDiagnostic, SourceStatus};
pub use report::{write_report, SureBetReport};
pub use types::*;
