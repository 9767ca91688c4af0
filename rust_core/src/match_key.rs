//! Match-key builder.
//!
//! A match key is the textual identity of a fixture within one source:
//! `"{home} vs {away} {kickoff}"`. Names are only trimmed and lower-cased;
//! spelling differences across bookmakers are left for the fuzzy matcher.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kickoff rendering used inside keys
pub const KICKOFF_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator between home and away names
pub const TEAM_SEPARATOR: &str = " vs ";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    /// Build the key for one normalized row
    pub fn build(home: &str, away: Option<&str>, kickoff: Option<NaiveDateTime>) -> Self {
        let kickoff = kickoff
            .map(|k| k.format(KICKOFF_KEY_FORMAT).to_string())
            .unwrap_or_default();
        MatchKey(format!(
            "{}{}{} {}",
            normalize_name(home),
            TEAM_SEPARATOR,
            away.map(normalize_name).unwrap_or_default(),
            kickoff
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchKey {
    fn from(s: &str) -> Self {
        MatchKey(s.to_string())
    }
}

/// Trim and case-fold
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
