//! Column mapping onto the canonical schema.
//!
//! This module provides:
//! - The canonical column set and its generic aliases
//! - A declarative per-source override table (built-in quirks + JSON file)
//! - Resolution of a dataset's columns into canonical positions

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Canonical columns every bookmaker row is mapped onto
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalColumn {
    Home,
    Away,
    OddsHome,
    OddsDraw,
    OddsAway,
    Kickoff,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 6] = [
        CanonicalColumn::Home,
        CanonicalColumn::Away,
        CanonicalColumn::OddsHome,
        CanonicalColumn::OddsDraw,
        CanonicalColumn::OddsAway,
        CanonicalColumn::Kickoff,
    ];

    /// Columns without which a source is skipped
    pub const REQUIRED: [CanonicalColumn; 5] = [
        CanonicalColumn::Home,
        CanonicalColumn::OddsHome,
        CanonicalColumn::OddsDraw,
        CanonicalColumn::OddsAway,
        CanonicalColumn::Kickoff,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalColumn::Home => "home",
            CanonicalColumn::Away => "away",
            CanonicalColumn::OddsHome => "odds_home",
            CanonicalColumn::OddsDraw => "odds_draw",
            CanonicalColumn::OddsAway => "odds_away",
            CanonicalColumn::Kickoff => "kickoff",
        }
    }

    /// Recognized spellings, all lowercase
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalColumn::Home => &["home", "home team", "home_team", "hometeam", "team1"],
            CanonicalColumn::Away => &["away", "away team", "away_team", "awayteam", "team2", "guest"],
            CanonicalColumn::OddsHome => &["1", "1.0", "1.00", "home-odds", "home_odds", "odds_home"],
            CanonicalColumn::OddsDraw => &["x", "x.0", "draw", "draw-odds", "draw_odds", "odds_draw"],
            CanonicalColumn::OddsAway => &["2", "2.0", "2.00", "away-odds", "away_odds", "odds_away"],
            CanonicalColumn::Kickoff => &["time", "kickoff", "kick-off", "start_time", "datetime", "date"],
        }
    }

    /// Case-insensitive alias lookup
    pub fn from_alias(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|col| col.name() == name || col.aliases().contains(&name.as_str()))
    }
}

/// Column renames for one source-name fragment
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOverride {
    /// Matched against the lowercased source id with `contains`
    pub fragment: String,
    /// Original column -> target name (canonical alias or anything else to ignore)
    pub renames: HashMap<String, String>,
}

impl SourceOverride {
    pub fn new(fragment: &str, renames: &[(&str, &str)]) -> Self {
        Self {
            fragment: fragment.to_lowercase(),
            renames: renames
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Target for a source column: exact name first, then case-insensitive
    fn target(&self, column: &str) -> Option<&str> {
        if let Some(target) = self.renames.get(column) {
            return Some(target.as_str());
        }
        let lower = column.trim().to_lowercase();
        self.renames
            .iter()
            .find(|(from, _)| from.trim().to_lowercase() == lower)
            .map(|(_, to)| to.as_str())
    }
}

/// Ordered override table; the first entry whose fragment the source id contains wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOverrides {
    entries: Vec<SourceOverride>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct OverrideFile(serde_json::Map<String, serde_json::Value>);

impl ColumnOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known bookmaker quirks
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                SourceOverride::new(
                    "meridianbet_fudbal",
                    &[
                        ("home", "home"),
                        ("away", "away"),
                        ("1", "1"),
                        ("2", "2"),
                        (
                            "Oba tima postižu bar po 1 gol i ukupno golova na meču manje od 3",
                            "x_extra",
                        ),
                        ("Venados FC", "irrelevant_column"),
                    ],
                ),
                SourceOverride::new(
                    "sportplus",
                    &[
                        ("kickoff", "time"),
                        ("1.00", "1"),
                        ("2.00", "2"),
                        ("time_duplicate", "duplicate_time"),
                    ],
                ),
            ],
        }
    }

    /// Load from a JSON file: `{ "fragment": { "original": "canonical", ... }, ... }`.
    /// Entry order follows the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read column overrides {}", path.display()))?;
        let file: OverrideFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid column overrides JSON in {}", path.display()))?;

        let mut overrides = Self::new();
        for (fragment, renames) in file.0 {
            let renames: HashMap<String, String> = serde_json::from_value(renames)
                .with_context(|| format!("Override '{fragment}' must map column -> column"))?;
            overrides.entries.push(SourceOverride {
                fragment: fragment.to_lowercase(),
                renames,
            });
        }
        Ok(overrides)
    }

    /// Append the built-in entries after the current ones (current entries take precedence)
    pub fn with_builtin(mut self) -> Self {
        self.entries.extend(Self::builtin().entries);
        self
    }

    pub fn push(&mut self, entry: SourceOverride) {
        self.entries.push(entry);
    }

    pub fn for_source(&self, source: &str) -> Option<&SourceOverride> {
        let source = source.to_lowercase();
        self.entries
            .iter()
            .find(|entry| !entry.fragment.is_empty() && source.contains(&entry.fragment))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where each canonical field lives in a dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    columns: HashMap<CanonicalColumn, String>,
}

impl ColumnMapping {
    /// Map a dataset's columns (in order). Overrides apply first, generic aliases
    /// cover the rest; the first column to claim a canonical field keeps it.
    pub fn resolve(source: &str, columns: &[String], overrides: &ColumnOverrides) -> Self {
        let source_override = overrides.for_source(source);
        let mut mapping = Self::default();

        for column in columns {
            let canonical = match source_override.and_then(|o| o.target(column)) {
                Some(target) => CanonicalColumn::from_alias(target),
                None => CanonicalColumn::from_alias(column),
            };
            let Some(canonical) = canonical else {
                continue;
            };
            if mapping.columns.contains_key(&canonical) {
                debug!(
                    source,
                    column = column.as_str(),
                    canonical = canonical.name(),
                    "Ignoring duplicate column"
                );
                continue;
            }
            mapping.columns.insert(canonical, column.clone());
        }
        mapping
    }

    /// Source column holding a canonical field
    pub fn column(&self, canonical: CanonicalColumn) -> Option<&str> {
        self.columns.get(&canonical).map(|s| s.as_str())
    }

    /// Required fields with no source column
    pub fn missing_required(&self) -> Vec<&'static str> {
        CanonicalColumn::REQUIRED
            .iter()
            .filter(|col| !self.columns.contains_key(*col))
            .map(|col| col.name())
            .collect()
    }
}
