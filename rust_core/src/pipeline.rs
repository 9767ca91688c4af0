//! Pipeline orchestration.
//!
//! Runs loader -> normalizer -> matcher -> merger -> evaluator -> allocator in
//! one pass and reports either the sure bets found or the reason there are
//! none, along with per-source diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::arbitrage::find_sure_bets;
use crate::config::ScannerConfig;
use crate::loader::{discover_sources, load_sources, source_id};
use crate::matching::{match_sources, MatchStats};
use crate::merge::merge_events;
use crate::normalize::{NormalizeStats, NormalizedSource, Normalizer};
use crate::stake::allocate;
use crate::types::{BookmakerDataset, SourceId, SureBet};

/// Fewer usable sources than this cannot produce a cross-book comparison
pub const MIN_VALID_SOURCES: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    SureBets(Vec<SureBet>),
    /// Events were compared but none priced below 100%
    NoOpportunities { events_evaluated: usize },
    /// Not enough sources survived loading and cleaning
    InsufficientData { valid_sources: usize },
}

impl RunOutcome {
    pub fn sure_bets(&self) -> &[SureBet] {
        match self {
            RunOutcome::SureBets(bets) => bets,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Used {
        normalize: NormalizeStats,
        matching: MatchStats,
    },
    Excluded,
    LoadFailed {
        reason: String,
    },
    NormalizeFailed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDiagnostic {
    pub source: SourceId,
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub sources: Vec<SourceDiagnostic>,
    pub universe_keys: usize,
    pub merged_events: usize,
    pub events_evaluated: usize,
}

impl Diagnostics {
    pub fn valid_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|d| matches!(d.status, SourceStatus::Used { .. }))
            .count()
    }
}

/// Everything one scanner run produced
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub diagnostics: Diagnostics,
    /// Input files that loaded, for archival
    pub loaded_paths: Vec<PathBuf>,
}

/// Discover, load and analyze every source in the configured directories
pub fn run(config: &ScannerConfig) -> RunResult {
    let paths = discover_sources(&config.source_dirs);
    info!(files = paths.len(), "Discovered source files");

    let loaded = load_sources(&paths, config);
    let (outcome, mut diagnostics) = analyze(&loaded.datasets, config);

    for source in &loaded.excluded {
        diagnostics.sources.push(SourceDiagnostic {
            source: source.clone(),
            path: None,
            status: SourceStatus::Excluded,
        });
    }
    for (path, err) in &loaded.failures {
        diagnostics.sources.push(SourceDiagnostic {
            source: source_id(path).unwrap_or_else(|| path.display().to_string()),
            path: Some(path.clone()),
            status: SourceStatus::LoadFailed {
                reason: err.to_string(),
            },
        });
    }
    diagnostics.sources.sort_by(|a, b| a.source.cmp(&b.source));

    RunResult {
        outcome,
        diagnostics,
        loaded_paths: loaded.loaded_paths(),
    }
}

/// Run every stage after loading on already-loaded datasets
pub fn analyze(
    datasets: &BTreeMap<SourceId, BookmakerDataset>,
    config: &ScannerConfig,
) -> (RunOutcome, Diagnostics) {
    let normalizer = Normalizer::from_config(config);
    let mut diagnostics = Diagnostics::default();

    let mut valid: Vec<NormalizedSource> = Vec::with_capacity(datasets.len());
    for dataset in datasets.values() {
        match normalizer.normalize(dataset) {
            Ok(source) => valid.push(source),
            Err(err) => {
                warn!(source = dataset.source.as_str(), error = %err, "Skipping source");
                diagnostics.sources.push(SourceDiagnostic {
                    source: dataset.source.clone(),
                    path: Some(dataset.path.clone()),
                    status: SourceStatus::NormalizeFailed {
                        reason: err.to_string(),
                    },
                });
            }
        }
    }

    if valid.len() < MIN_VALID_SOURCES {
        for source in &valid {
            diagnostics.sources.push(used(source, MatchStats::default(), datasets));
        }
        diagnostics.sources.sort_by(|a, b| a.source.cmp(&b.source));
        warn!(valid_sources = valid.len(), "Not enough valid sources to compare");
        return (
            RunOutcome::InsufficientData {
                valid_sources: valid.len(),
            },
            diagnostics,
        );
    }

    let matching = match_sources(&valid, config.fuzzy_threshold);
    for source in &valid {
        let stats = matching
            .per_source
            .get(&source.source)
            .map(|m| m.stats)
            .unwrap_or_default();
        diagnostics.sources.push(used(source, stats, datasets));
    }
    diagnostics.sources.sort_by(|a, b| a.source.cmp(&b.source));

    let events = merge_events(&valid, &matching);
    let evaluation = find_sure_bets(&events);

    diagnostics.universe_keys = matching.universe.len();
    diagnostics.merged_events = events.len();
    diagnostics.events_evaluated = evaluation.evaluated;

    let mut sure_bets = Vec::with_capacity(evaluation.candidates.len());
    for candidate in evaluation.candidates {
        match allocate(&candidate.best_odds(), config.total_stake) {
            Ok(plan) if !plan.is_degenerate() => sure_bets.push(SureBet { candidate, plan }),
            Ok(_) => {}
            Err(err) => {
                warn!(key = %candidate.event.key, error = %err, "Skipping candidate");
            }
        }
    }

    info!(
        sources = valid.len(),
        universe = diagnostics.universe_keys,
        events = diagnostics.merged_events,
        evaluated = diagnostics.events_evaluated,
        sure_bets = sure_bets.len(),
        "Analysis complete"
    );

    let outcome = if sure_bets.is_empty() {
        RunOutcome::NoOpportunities {
            events_evaluated: evaluation.evaluated,
        }
    } else {
        RunOutcome::SureBets(sure_bets)
    };
    (outcome, diagnostics)
}

fn used(
    source: &NormalizedSource,
    matching: MatchStats,
    datasets: &BTreeMap<SourceId, BookmakerDataset>,
) -> SourceDiagnostic {
    SourceDiagnostic {
        source: source.source.clone(),
        path: datasets.get(&source.source).map(|d| d.path.clone()),
        status: SourceStatus::Used {
            normalize: source.stats,
            matching,
        },
    }
}
