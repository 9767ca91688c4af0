//! Arbitrage evaluator.
//!
//! For each merged event, takes the highest price per outcome across the
//! contributing bookmakers and keeps events whose best prices imply less
//! than 100%.

use rayon::prelude::*;
use tracing::debug;

use crate::types::{ArbitrageCandidate, BestPrice, MergedEvent, Outcome, PerOutcome};

/// Fewer contributing sources than this can never form a sure bet
pub const MIN_SOURCES: usize = 2;

/// Result of scanning a batch of events
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Qualifying candidates, in event order
    pub candidates: Vec<ArbitrageCandidate>,
    /// Events with enough sources to be evaluated
    pub evaluated: usize,
}

/// Highest odds per outcome and who offers them. Ties keep the first source
/// in id order. `None` if no source quotes the event.
pub fn best_prices(event: &MergedEvent) -> Option<PerOutcome<BestPrice>> {
    let mut best: PerOutcome<Option<BestPrice>> = PerOutcome::new(None, None, None);

    for (source, odds) in event.contributing() {
        for outcome in Outcome::ALL {
            let price = *odds.get(outcome);
            if !(price.is_finite() && price > 0.0) {
                continue;
            }
            let slot = match outcome {
                Outcome::Home => &mut best.home,
                Outcome::Draw => &mut best.draw,
                Outcome::Away => &mut best.away,
            };
            let better = slot.as_ref().map(|b| price > b.odds).unwrap_or(true);
            if better {
                *slot = Some(BestPrice {
                    odds: price,
                    source: source.clone(),
                });
            }
        }
    }

    Some(PerOutcome::new(best.home?, best.draw?, best.away?))
}

/// Build the candidate view for one event, qualifying or not.
/// `None` when the event has too few sources or an outcome lacks a price.
pub fn evaluate(event: &MergedEvent) -> Option<ArbitrageCandidate> {
    if event.contributing_count() < MIN_SOURCES {
        return None;
    }
    let best = best_prices(event)?;
    let implied_probability = best.home.odds.recip() + best.draw.odds.recip() + best.away.odds.recip();

    Some(ArbitrageCandidate {
        event: event.clone(),
        best,
        implied_probability,
    })
}

/// Evaluate events in parallel and keep the sure bets
pub fn find_sure_bets(events: &[MergedEvent]) -> Evaluation {
    let evaluated: Vec<ArbitrageCandidate> = events.par_iter().filter_map(evaluate).collect();
    let mut result = Evaluation {
        evaluated: evaluated.len(),
        ..Default::default()
    };

    for candidate in evaluated {
        debug!(
            key = %candidate.event.key,
            implied = candidate.implied_probability,
            "Evaluated event"
        );
        if candidate.is_sure_bet() {
            result.candidates.push(candidate);
        }
    }
    result
}
