//! Shared domain types for the sure-bet pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::match_key::MatchKey;

/// Bookmaker identifier (the input file stem, e.g. "mozzart")
pub type SourceId = String;

/// One raw row as delivered by a scraper: column name -> cell
pub type RawRow = Map<String, Value>;

/// Outcome of the three-way 1/X/2 market
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    /// Betting-slip label
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per 1/X/2 outcome. Used for odds, stakes, profits and best prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerOutcome<T> {
    pub home: T,
    pub draw: T,
    pub away: T,
}

impl<T> PerOutcome<T> {
    pub fn new(home: T, draw: T, away: T) -> Self {
        Self { home, draw, away }
    }

    pub fn get(&self, outcome: Outcome) -> &T {
        match outcome {
            Outcome::Home => &self.home,
            Outcome::Draw => &self.draw,
            Outcome::Away => &self.away,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Outcome, &T) -> U) -> PerOutcome<U> {
        PerOutcome {
            home: f(Outcome::Home, &self.home),
            draw: f(Outcome::Draw, &self.draw),
            away: f(Outcome::Away, &self.away),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, &T)> {
        Outcome::ALL.into_iter().map(move |o| (o, self.get(o)))
    }
}

/// Decimal odds for the three outcomes
pub type Odds = PerOutcome<f64>;

impl PerOutcome<f64> {
    /// Sum of the three values (used as the dedup "completeness" proxy for odds)
    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Sum of reciprocals. For odds this is the book's implied probability.
    pub fn implied_probability(&self) -> f64 {
        1.0 / self.home + 1.0 / self.draw + 1.0 / self.away
    }

    /// True if every value is finite and inside `[min, max]`
    pub fn within(&self, min: f64, max: f64) -> bool {
        self.iter().all(|(_, v)| v.is_finite() && *v >= min && *v <= max)
    }

    pub fn all_positive(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite() && *v > 0.0)
    }
}

/// Raw tabular input from one bookmaker
#[derive(Clone, Debug)]
pub struct BookmakerDataset {
    pub source: SourceId,
    pub path: PathBuf,
    /// Column names in first-seen order
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl BookmakerDataset {
    pub fn new(source: impl Into<SourceId>, path: impl Into<PathBuf>, rows: Vec<RawRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.keys() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.clone());
                }
            }
        }
        Self {
            source: source.into(),
            path: path.into(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Canonical row after schema normalization
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedRow {
    pub home: String,
    pub away: Option<String>,
    pub kickoff: Option<NaiveDateTime>,
    pub odds: Odds,
    pub key: MatchKey,
}

impl NormalizedRow {
    pub fn new(home: String, away: Option<String>, kickoff: Option<NaiveDateTime>, odds: Odds) -> Self {
        let key = MatchKey::build(&home, away.as_deref(), kickoff);
        Self {
            home,
            away,
            kickoff,
            odds,
            key,
        }
    }
}

/// One real-world match assembled from every source that matched it
#[derive(Clone, Debug, PartialEq)]
pub struct MergedEvent {
    /// Universe key this event was built for
    pub key: MatchKey,
    pub home: String,
    pub away: Option<String>,
    pub kickoff: Option<NaiveDateTime>,
    /// Every source in the run; `None` when that source had no acceptable match
    pub quotes: BTreeMap<SourceId, Option<Odds>>,
}

impl MergedEvent {
    /// Sources with real odds for this event, in source-id order
    pub fn contributing(&self) -> impl Iterator<Item = (&SourceId, &Odds)> {
        self.quotes
            .iter()
            .filter_map(|(source, odds)| odds.as_ref().map(|o| (source, o)))
    }

    pub fn contributing_count(&self) -> usize {
        self.contributing().count()
    }
}

/// Best available price for one outcome and who offers it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    pub odds: f64,
    pub source: SourceId,
}

/// A merged event viewed through its best prices
#[derive(Clone, Debug, PartialEq)]
pub struct ArbitrageCandidate {
    pub event: MergedEvent,
    pub best: PerOutcome<BestPrice>,
    pub implied_probability: f64,
}

impl ArbitrageCandidate {
    pub fn best_odds(&self) -> Odds {
        self.best.map(|_, price| price.odds)
    }

    /// Sure bet iff the best prices imply less than 100%
    pub fn is_sure_bet(&self) -> bool {
        self.implied_probability < 1.0
    }

    /// Guaranteed return as a percentage of stake (0 when not a sure bet)
    pub fn edge_pct(&self) -> f64 {
        if self.is_sure_bet() {
            (1.0 / self.implied_probability - 1.0) * 100.0
        } else {
            0.0
        }
    }
}

/// Equal-profit split of a total stake across the three outcomes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakePlan {
    pub total_stake: f64,
    pub stakes: PerOutcome<f64>,
    pub profits: PerOutcome<f64>,
}

impl StakePlan {
    /// All-zero plan: no non-negative equal-profit solution exists
    pub fn degenerate(total_stake: f64) -> Self {
        Self {
            total_stake,
            stakes: PerOutcome::default(),
            profits: PerOutcome::default(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.stakes.iter().all(|(_, s)| *s == 0.0)
    }

    /// Profit common to every outcome (the home profit, all three are equal)
    pub fn equal_profit(&self) -> f64 {
        self.profits.home
    }
}

/// A qualifying candidate together with its staking plan
#[derive(Clone, Debug, PartialEq)]
pub struct SureBet {
    pub candidate: ArbitrageCandidate,
    pub plan: StakePlan,
}
