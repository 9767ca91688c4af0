//! Merge engine: one wide record per real-world event.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tracing::debug;

use crate::matching::MatchingOutcome;
use crate::normalize::NormalizedSource;
use crate::types::{MergedEvent, NormalizedRow, Odds, SourceId};

/// Fold matching results into events.
///
/// Base fields come from the first source (id order) with a match. A universe
/// key whose source->row contributions repeat an earlier event adds nothing
/// and is collapsed into that event. Single-source events are kept.
pub fn merge_events(sources: &[NormalizedSource], outcome: &MatchingOutcome) -> Vec<MergedEvent> {
    let by_id: FxHashMap<&str, &NormalizedSource> =
        sources.iter().map(|s| (s.source.as_str(), s)).collect();

    let mut seen: FxHashSet<Vec<(&str, usize)>> = FxHashSet::default();
    let mut events = Vec::new();
    let mut collapsed = 0usize;

    for (idx, key) in outcome.universe.iter().enumerate() {
        let mut contributions: Vec<(&str, usize)> = Vec::new();
        let mut quotes: BTreeMap<SourceId, Option<Odds>> = BTreeMap::new();
        let mut base: Option<&NormalizedRow> = None;

        for (source_id, matches) in &outcome.per_source {
            let hit = matches.get(idx).and_then(|m| {
                by_id
                    .get(source_id.as_str())
                    .and_then(|s| s.rows.get(m.row))
                    .map(|row| (m.row, row))
            });
            match hit {
                Some((row_idx, row)) => {
                    contributions.push((source_id.as_str(), row_idx));
                    base.get_or_insert(row);
                    quotes.insert(source_id.clone(), Some(row.odds));
                }
                None => {
                    quotes.insert(source_id.clone(), None);
                }
            }
        }

        let Some(base) = base else {
            continue;
        };
        if !seen.insert(contributions) {
            collapsed += 1;
            continue;
        }

        events.push(MergedEvent {
            key: key.clone(),
            home: base.home.clone(),
            away: base.away.clone(),
            kickoff: base.kickoff,
            quotes,
        });
    }

    debug!(
        universe = outcome.universe.len(),
        events = events.len(),
        collapsed,
        "Merged events"
    );
    events
}
