//! Scanner configuration.
//!
//! Centralizes every run setting with defaults loaded from environment
//! variables. The resulting [`ScannerConfig`] is passed explicitly to
//! [`crate::pipeline::run`]; nothing here is process-global.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::normalize::columns::ColumnOverrides;

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;
pub const DEFAULT_TOTAL_STAKE: f64 = 100.0;
pub const DEFAULT_MIN_ODDS: f64 = 1.01;
pub const DEFAULT_MAX_ODDS: f64 = 100.0;

/// Team-name spelling fixes applied before key building ("Man Utd" -> "Manchester United")
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamAliases {
    aliases: HashMap<String, String>,
}

impl TeamAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON object file: `{ "alias": "canonical", ... }`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read team aliases {}", path.display()))?;
        let raw: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid team aliases JSON in {}", path.display()))?;
        let mut aliases = Self::new();
        for (alias, canonical) in raw {
            aliases.insert(&alias, &canonical);
        }
        Ok(aliases)
    }

    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.trim().to_lowercase(), canonical.trim().to_string());
    }

    /// Canonical spelling, or the input unchanged when no alias is known
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases
            .get(&name.trim().to_lowercase())
            .map(|s| s.as_str())
            .unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Configuration for one scanner run
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Directories scanned for bookmaker files
    pub source_dirs: Vec<PathBuf>,
    /// Where the report is written
    pub output_dir: PathBuf,
    /// Root of the dated archive folders
    pub archive_dir: PathBuf,
    /// Archive inputs after the report is written
    pub archive_enabled: bool,

    /// Minimum token-set similarity (0-100) to accept a cross-source match
    pub fuzzy_threshold: u8,
    /// Stake distributed per sure bet
    pub total_stake: f64,
    /// Plausible odds range; rows outside are discarded
    pub min_odds: f64,
    pub max_odds: f64,
    /// Drop rows whose kickoff cannot be parsed
    pub require_kickoff: bool,

    /// Loader thread pool size
    pub load_workers: usize,
    /// Source-id fragments that are never loaded
    pub excluded_sources: Vec<String>,

    pub column_overrides: ColumnOverrides,
    pub team_aliases: TeamAliases,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("./data")],
            output_dir: PathBuf::from("./results"),
            archive_dir: PathBuf::from("./archive"),
            archive_enabled: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            total_stake: DEFAULT_TOTAL_STAKE,
            min_odds: DEFAULT_MIN_ODDS,
            max_odds: DEFAULT_MAX_ODDS,
            require_kickoff: true,
            load_workers: default_workers(),
            excluded_sources: Vec::new(),
            column_overrides: ColumnOverrides::builtin(),
            team_aliases: TeamAliases::new(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables with defaults.
    /// Not validated here; call [`ScannerConfig::validate`] once any CLI
    /// overrides are applied.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let source_dirs = match env::var("SOURCE_DIRS") {
            Ok(raw) => parse_csv(&raw).into_iter().map(PathBuf::from).collect(),
            Err(_) => defaults.source_dirs,
        };

        let column_overrides = match env::var("COLUMN_OVERRIDES_PATH") {
            Ok(path) => ColumnOverrides::load(Path::new(&path))
                .context("COLUMN_OVERRIDES_PATH")?
                .with_builtin(),
            Err(_) => defaults.column_overrides,
        };

        let team_aliases = match env::var("TEAM_ALIASES_PATH") {
            Ok(path) => TeamAliases::load(Path::new(&path)).context("TEAM_ALIASES_PATH")?,
            Err(_) => defaults.team_aliases,
        };

        Ok(Self {
            source_dirs,
            output_dir: parse_path_env("OUTPUT_DIR", defaults.output_dir),
            archive_dir: parse_path_env("ARCHIVE_DIR", defaults.archive_dir),
            archive_enabled: parse_bool_env("ARCHIVE_ENABLED", defaults.archive_enabled),
            fuzzy_threshold: parse_env("FUZZY_THRESHOLD", defaults.fuzzy_threshold)?,
            total_stake: parse_env("TOTAL_STAKE", defaults.total_stake)?,
            min_odds: parse_env("MIN_ODDS", defaults.min_odds)?,
            max_odds: parse_env("MAX_ODDS", defaults.max_odds)?,
            require_kickoff: parse_bool_env("REQUIRE_KICKOFF", defaults.require_kickoff),
            load_workers: parse_env("LOAD_WORKERS", defaults.load_workers)?,
            excluded_sources: env::var("EXCLUDED_SOURCES")
                .map(|raw| parse_csv(&raw))
                .unwrap_or_default(),
            column_overrides,
            team_aliases,
        })
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fuzzy_threshold > 100 {
            return Err(ConfigError::InvalidThreshold(self.fuzzy_threshold as u32));
        }
        if !(self.total_stake.is_finite() && self.total_stake > 0.0) {
            return Err(ConfigError::InvalidStake(self.total_stake));
        }
        if !(self.min_odds > 0.0 && self.min_odds < self.max_odds && self.max_odds.is_finite()) {
            return Err(ConfigError::InvalidOddsBounds {
                min: self.min_odds,
                max: self.max_odds,
            });
        }
        if self.load_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.source_dirs.is_empty() {
            return Err(ConfigError::NoSourceDirs);
        }
        Ok(())
    }

    /// True if the source id contains any excluded fragment (case-insensitive)
    pub fn is_excluded(&self, source: &str) -> bool {
        let source = source.to_lowercase();
        self.excluded_sources
            .iter()
            .any(|fragment| !fragment.is_empty() && source.contains(&fragment.to_lowercase()))
    }

    /// Log current configuration (useful at startup)
    pub fn log_config(&self) {
        info!(
            source_dirs = ?self.source_dirs,
            output_dir = %self.output_dir.display(),
            archive_dir = %self.archive_dir.display(),
            archive_enabled = self.archive_enabled,
            "ScannerConfig loaded"
        );
        info!(
            fuzzy_threshold = self.fuzzy_threshold,
            total_stake = self.total_stake,
            min_odds = self.min_odds,
            max_odds = self.max_odds,
            require_kickoff = self.require_kickoff,
            load_workers = self.load_workers,
            "Matching and staking settings"
        );
        info!(
            overrides = self.column_overrides.len(),
            team_aliases = self.team_aliases.len(),
            excluded = ?self.excluded_sources,
            "Normalization tables"
        );
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

fn parse_path_env(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {key}: {raw}")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => {
            warn!("Ignoring unreadable {}: {} (using {})", key, e, default);
            Ok(default)
        }
    }
}
