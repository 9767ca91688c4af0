//! Schema normalization.
//!
//! Turns one raw [`BookmakerDataset`] into canonical [`NormalizedRow`]s:
//! column mapping, odds/kickoff coercion, team aliasing, intra-source
//! deduplication (lowest odds sum per match key) and odds-range filtering.

pub mod coerce;
pub mod columns;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ScannerConfig, TeamAliases};
use crate::error::NormalizeError;
use crate::match_key::MatchKey;
use crate::types::{BookmakerDataset, NormalizedRow, Odds, RawRow, SourceId};
use columns::{CanonicalColumn, ColumnMapping, ColumnOverrides};

/// Row accounting for one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub input_rows: usize,
    pub missing_fields: usize,
    pub invalid_odds: usize,
    pub invalid_kickoff: usize,
    pub duplicates: usize,
    pub out_of_range: usize,
    pub kept: usize,
}

impl NormalizeStats {
    pub fn dropped(&self) -> usize {
        self.input_rows - self.kept
    }
}

/// Clean rows for one bookmaker
#[derive(Debug, Clone)]
pub struct NormalizedSource {
    pub source: SourceId,
    pub rows: Vec<NormalizedRow>,
    pub stats: NormalizeStats,
}

/// Settings the normalizer needs, borrowed from [`ScannerConfig`]
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    pub overrides: &'a ColumnOverrides,
    pub aliases: &'a TeamAliases,
    pub min_odds: f64,
    pub max_odds: f64,
    pub require_kickoff: bool,
}

impl<'a> Normalizer<'a> {
    pub fn from_config(config: &'a ScannerConfig) -> Self {
        Self {
            overrides: &config.column_overrides,
            aliases: &config.team_aliases,
            min_odds: config.min_odds,
            max_odds: config.max_odds,
            require_kickoff: config.require_kickoff,
        }
    }

    /// Normalize one dataset. Fails when required columns are missing or no row survives.
    pub fn normalize(&self, dataset: &BookmakerDataset) -> Result<NormalizedSource, NormalizeError> {
        let source = dataset.source.as_str();
        let mapping = ColumnMapping::resolve(source, &dataset.columns, self.overrides);

        let missing = mapping.missing_required();
        if !missing.is_empty() {
            return Err(NormalizeError::MissingColumns {
                source_id: source.to_string(),
                missing,
            });
        }

        let mut stats = NormalizeStats {
            input_rows: dataset.len(),
            ..Default::default()
        };

        let parsed: Vec<NormalizedRow> = dataset
            .rows
            .iter()
            .filter_map(|row| self.parse_row(row, &mapping, &mut stats))
            .collect();

        let deduped = dedup_lowest_odds_sum(parsed);
        stats.duplicates = stats.input_rows
            - stats.missing_fields
            - stats.invalid_odds
            - stats.invalid_kickoff
            - deduped.len();

        let before = deduped.len();
        let rows: Vec<NormalizedRow> = deduped
            .into_iter()
            .filter(|row| row.odds.within(self.min_odds, self.max_odds))
            .collect();
        stats.out_of_range = before - rows.len();
        stats.kept = rows.len();

        if stats.out_of_range > 0 {
            warn!(
                source,
                dropped = stats.out_of_range,
                min_odds = self.min_odds,
                max_odds = self.max_odds,
                "Dropped rows with outlier odds"
            );
        }
        if stats.dropped() > 0 {
            info!(
                source,
                missing_fields = stats.missing_fields,
                invalid_odds = stats.invalid_odds,
                invalid_kickoff = stats.invalid_kickoff,
                duplicates = stats.duplicates,
                out_of_range = stats.out_of_range,
                kept = stats.kept,
                "Dropped rows during cleaning"
            );
        }

        if rows.is_empty() {
            return Err(NormalizeError::NoValidRows {
                source_id: source.to_string(),
                input_rows: stats.input_rows,
            });
        }

        Ok(NormalizedSource {
            source: source.to_string(),
            rows,
            stats,
        })
    }

    fn parse_row(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        stats: &mut NormalizeStats,
    ) -> Option<NormalizedRow> {
        let cell = |col: CanonicalColumn| mapping.column(col).and_then(|name| row.get(name));

        let Some(home) = cell(CanonicalColumn::Home).and_then(coerce::parse_text) else {
            stats.missing_fields += 1;
            return None;
        };
        let away = cell(CanonicalColumn::Away).and_then(coerce::parse_text);

        let odds = (
            cell(CanonicalColumn::OddsHome).and_then(coerce::parse_odds),
            cell(CanonicalColumn::OddsDraw).and_then(coerce::parse_odds),
            cell(CanonicalColumn::OddsAway).and_then(coerce::parse_odds),
        );
        let (Some(home_odds), Some(draw_odds), Some(away_odds)) = odds else {
            stats.invalid_odds += 1;
            return None;
        };

        let kickoff = cell(CanonicalColumn::Kickoff).and_then(coerce::parse_kickoff);
        if kickoff.is_none() && self.require_kickoff {
            stats.invalid_kickoff += 1;
            return None;
        }

        let home = self.aliases.resolve(&home).to_string();
        let away = away.map(|a| self.aliases.resolve(&a).to_string());

        Some(NormalizedRow::new(
            home,
            away,
            kickoff,
            Odds::new(home_odds, draw_odds, away_odds),
        ))
    }
}

/// Keep one row per match key: the one with the lowest odds sum, earliest on ties.
/// Output preserves first-seen key order.
pub fn dedup_lowest_odds_sum(rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
    let mut index: FxHashMap<MatchKey, usize> = FxHashMap::default();
    let mut kept: Vec<NormalizedRow> = Vec::with_capacity(rows.len());

    for row in rows {
        match index.get(&row.key) {
            Some(&i) => {
                if row.odds.sum() < kept[i].odds.sum() {
                    debug!(key = %row.key, "Replacing duplicate with lower odds sum");
                    kept[i] = row;
                }
            }
            None => {
                index.insert(row.key.clone(), kept.len());
                kept.push(row);
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(source: &str, rows: serde_json::Value) -> BookmakerDataset {
        let rows = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect();
        BookmakerDataset::new(source, format!("/data/{source}.json"), rows)
    }

    fn normalize(config: &ScannerConfig, ds: &BookmakerDataset) -> Result<NormalizedSource, NormalizeError> {
        Normalizer::from_config(config).normalize(ds)
    }

    #[test]
    fn test_normalize_basic_rows() {
        let config = ScannerConfig::default();
        let ds = dataset(
            "mozzart",
            json!([
                {"home": "Partizan", "away": "Vojvodina", "1": "1,85", "x": "3,40", "2": "4,20", "time": "2025-03-01 18:00"},
                {"home": "Zvezda", "away": "Cukaricki", "1": 1.30, "x": 5.0, "2": 9.5, "time": "2025-03-01 20:00"}
            ]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].odds, Odds::new(1.85, 3.4, 4.2));
        assert_eq!(out.rows[0].away.as_deref(), Some("Vojvodina"));
        assert_eq!(out.stats.kept, 2);
        assert_eq!(out.stats.dropped(), 0);
    }

    #[test]
    fn test_missing_columns_fail_source() {
        let config = ScannerConfig::default();
        let ds = dataset("book", json!([{"home": "A", "1": 2.0, "2": 3.0}]));
        let err = normalize(&config, &ds).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MissingColumns {
                source_id: "book".to_string(),
                missing: vec!["odds_draw", "kickoff"],
            }
        );
    }

    #[test]
    fn test_away_column_is_optional() {
        let config = ScannerConfig::default();
        let ds = dataset(
            "noaway",
            json!([{"home": "Partizan - Vojvodina", "1": 1.9, "x": 3.3, "2": 4.0, "time": "2025-03-01 18:00"}]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.rows[0].away, None);
        assert_eq!(out.rows[0].key.as_str(), "partizan - vojvodina vs  2025-03-01 18:00:00");
    }

    #[test]
    fn test_row_level_drops_are_counted() {
        let config = ScannerConfig::default();
        let ds = dataset(
            "book",
            json!([
                {"home": "", "away": "B", "1": 2.0, "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"},
                {"home": "A", "away": "B", "1": "n/a", "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"},
                {"home": "C", "away": "D", "1": 2.0, "x": 3.0, "2": 4.0, "time": "later"},
                {"home": "E", "away": "F", "1": 1.0, "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"},
                {"home": "G", "away": "H", "1": 2.0, "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"}
            ]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.stats.missing_fields, 1);
        assert_eq!(out.stats.invalid_odds, 1);
        assert_eq!(out.stats.invalid_kickoff, 1);
        assert_eq!(out.stats.out_of_range, 1);
        assert_eq!(out.stats.kept, 1);
        assert_eq!(out.rows[0].home, "G");
    }

    #[test]
    fn test_unparsed_kickoff_kept_when_not_required() {
        let config = ScannerConfig {
            require_kickoff: false,
            ..Default::default()
        };
        let ds = dataset(
            "book",
            json!([{"home": "C", "away": "D", "1": 2.0, "x": 3.0, "2": 4.0, "time": "later"}]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.rows[0].kickoff, None);
    }

    #[test]
    fn test_dedup_keeps_lowest_odds_sum() {
        let config = ScannerConfig::default();
        let ds = dataset(
            "book",
            json!([
                {"home": "A", "away": "B", "1": 2.2, "x": 3.5, "2": 3.9, "time": "2025-03-01 18:00"},
                {"home": "a ", "away": "B", "1": 2.0, "x": 3.3, "2": 3.8, "time": "2025-03-01 18:00"},
                {"home": "A", "away": "B", "1": 2.1, "x": 3.4, "2": 4.0, "time": "2025-03-01 18:00"}
            ]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].odds, Odds::new(2.0, 3.3, 3.8));
        assert_eq!(out.stats.duplicates, 2);
    }

    #[test]
    fn test_dedup_tie_keeps_first() {
        let a = NormalizedRow::new("A".into(), Some("B".into()), None, Odds::new(2.0, 3.0, 4.0));
        let b = NormalizedRow::new("A".into(), Some("B".into()), None, Odds::new(3.0, 3.0, 3.0));
        let out = dedup_lowest_odds_sum(vec![a.clone(), b]);
        assert_eq!(out, vec![a]);
    }

    #[test]
    fn test_all_rows_invalid_fails_source() {
        let config = ScannerConfig::default();
        let ds = dataset(
            "book",
            json!([{"home": "A", "away": "B", "1": 0.5, "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"}]),
        );
        assert!(matches!(
            normalize(&config, &ds),
            Err(NormalizeError::NoValidRows { input_rows: 1, .. })
        ));
    }

    #[test]
    fn test_team_aliases_applied_before_keying() {
        let mut config = ScannerConfig::default();
        config.team_aliases.insert("Man Utd", "Manchester United");
        let ds = dataset(
            "book",
            json!([{"home": "Man Utd", "away": "Chelsea", "1": 2.0, "x": 3.0, "2": 4.0, "time": "2025-03-01 18:00"}]),
        );
        let out = normalize(&config, &ds).unwrap();
        assert_eq!(out.rows[0].home, "Manchester United");
        assert!(out.rows[0].key.as_str().starts_with("manchester united vs chelsea"));
    }
}
