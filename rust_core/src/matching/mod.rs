//! Fuzzy matching engine.
//!
//! Builds the universe of candidate keys across every source and, for each
//! source independently, picks the best-scoring row for every universe key.
//! Universe keys present verbatim in a source skip scoring entirely; the rest
//! are scored in one batched [`token_set::score_matrix`] call per source.

pub mod token_set;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::match_key::MatchKey;
use crate::normalize::NormalizedSource;
use crate::types::SourceId;
use token_set::{argmax, score_matrix, TokenSet};

/// Score recorded for an exact key match
pub const EXACT_SCORE: f64 = 100.0;

/// Accepted match of one universe key in one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMatch {
    /// Index into the source's normalized rows
    pub row: usize,
    pub score: f64,
    pub exact: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub universe: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub absent: usize,
}

impl MatchStats {
    pub fn matched(&self) -> usize {
        self.exact + self.fuzzy
    }
}

/// One source's view of the universe, aligned by universe index
#[derive(Debug, Clone, Default)]
pub struct SourceMatches {
    pub matches: Vec<Option<SourceMatch>>,
    pub stats: MatchStats,
}

impl SourceMatches {
    pub fn get(&self, universe_idx: usize) -> Option<&SourceMatch> {
        self.matches.get(universe_idx).and_then(|m| m.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchingOutcome {
    pub universe: Vec<MatchKey>,
    pub per_source: BTreeMap<SourceId, SourceMatches>,
}

/// Union of every source's keys in first-seen order (sources as given, rows in order)
pub fn build_universe(sources: &[NormalizedSource]) -> Vec<MatchKey> {
    let mut seen: FxHashSet<&MatchKey> = FxHashSet::default();
    let mut universe = Vec::new();
    for source in sources {
        for row in &source.rows {
            if seen.insert(&row.key) {
                universe.push(row.key.clone());
            }
        }
    }
    universe
}

/// Match every source against the shared universe.
///
/// `sources` should be in source-id order so the universe order is stable.
/// A match is accepted when its score is at least `threshold`.
pub fn match_sources(sources: &[NormalizedSource], threshold: u8) -> MatchingOutcome {
    let universe = build_universe(sources);
    let universe_tokens: Vec<TokenSet> = universe
        .par_iter()
        .map(|key| TokenSet::new(key.as_str()))
        .collect();

    let per_source: BTreeMap<SourceId, SourceMatches> = sources
        .par_iter()
        .map(|source| {
            let matches = match_source(&universe, &universe_tokens, source, threshold);
            (source.source.clone(), matches)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    for (source, matches) in &per_source {
        let stats = &matches.stats;
        info!(
            source = source.as_str(),
            universe = stats.universe,
            exact = stats.exact,
            fuzzy = stats.fuzzy,
            absent = stats.absent,
            "Matched source against universe"
        );
        for (idx, m) in matches.matches.iter().enumerate() {
            if m.is_none() {
                debug!(source = source.as_str(), key = %universe[idx], "No match above threshold");
            }
        }
    }

    MatchingOutcome {
        universe,
        per_source,
    }
}

/// Best row of one source for every universe key
pub fn match_source(
    universe: &[MatchKey],
    universe_tokens: &[TokenSet],
    source: &NormalizedSource,
    threshold: u8,
) -> SourceMatches {
    let mut by_key: FxHashMap<&MatchKey, usize> = FxHashMap::default();
    for (idx, row) in source.rows.iter().enumerate() {
        by_key.entry(&row.key).or_insert(idx);
    }

    let mut matches: Vec<Option<SourceMatch>> = vec![None; universe.len()];
    let mut stats = MatchStats {
        universe: universe.len(),
        ..Default::default()
    };

    // Exact hits first; everything else goes into the batched scoring call
    let mut pending: Vec<usize> = Vec::new();
    for (u, key) in universe.iter().enumerate() {
        match by_key.get(key) {
            Some(&row) => {
                matches[u] = Some(SourceMatch {
                    row,
                    score: EXACT_SCORE,
                    exact: true,
                });
                stats.exact += 1;
            }
            None => pending.push(u),
        }
    }

    if !pending.is_empty() && !source.rows.is_empty() {
        let choices: Vec<TokenSet> = source
            .rows
            .iter()
            .map(|row| TokenSet::new(row.key.as_str()))
            .collect();
        let queries: Vec<TokenSet> = pending.iter().map(|&u| universe_tokens[u].clone()).collect();
        let scores = score_matrix(&queries, &choices);

        let threshold = f64::from(threshold);
        for (&u, row_scores) in pending.iter().zip(&scores) {
            if let Some((row, score)) = argmax(row_scores) {
                if score >= threshold {
                    matches[u] = Some(SourceMatch {
                        row,
                        score,
                        exact: false,
                    });
                    stats.fuzzy += 1;
                }
            }
        }
    }

    stats.absent = stats.universe - stats.matched();
    SourceMatches { matches, stats }
}
