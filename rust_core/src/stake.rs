//! Stake allocator.
//!
//! Closed-form equal-profit split: with best odds `o_i` and
//! `implied = Σ 1/o_i`, staking `S / (o_i · implied)` on each outcome returns
//! `S / implied` whichever outcome wins.

use crate::error::StakeError;
use crate::types::{Odds, Outcome, PerOutcome, StakePlan};

/// Split `total_stake` across the three outcomes so every outcome pays the same.
///
/// Returns the degenerate all-zero plan when `implied >= 1` (no non-negative
/// equal-profit split exists).
pub fn allocate(best: &Odds, total_stake: f64) -> Result<StakePlan, StakeError> {
    if !(total_stake.is_finite() && total_stake > 0.0) {
        return Err(StakeError::InvalidStake(total_stake));
    }
    for (outcome, &odds) in best.iter() {
        if !(odds.is_finite() && odds > 0.0) {
            return Err(StakeError::NonPositiveOdds {
                outcome: outcome_name(outcome),
                odds,
            });
        }
    }

    let implied = best.implied_probability();
    if implied >= 1.0 {
        return Ok(StakePlan::degenerate(total_stake));
    }

    let stakes: PerOutcome<f64> = best.map(|_, &odds| total_stake / (odds * implied));
    let profits = stakes.map(|outcome, &stake| best.get(outcome) * stake - total_stake);

    Ok(StakePlan {
        total_stake,
        stakes,
        profits,
    })
}

/// Profit every outcome returns for a given implied probability
pub fn guaranteed_profit(total_stake: f64, implied: f64) -> f64 {
    total_stake * (1.0 / implied - 1.0)
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Home => "home",
        Outcome::Draw => "draw",
        Outcome::Away => "away",
    }
}
