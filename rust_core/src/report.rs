//! Sure-bet report.
//!
//! Written as `sure_bets.json` with a `summary` view (best prices per
//! outcome) and a `detailed_staking` view (stakes and profits per outcome).

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ReportError;
use crate::match_key::KICKOFF_KEY_FORMAT;
use crate::pipeline::Diagnostics;
use crate::types::{Odds, SourceId, SureBet};

pub const REPORT_FILE_NAME: &str = "sure_bets.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub home: String,
    pub away: Option<String>,
    pub kickoff: Option<String>,
    pub best_home_odds: f64,
    pub best_home_source: SourceId,
    pub best_draw_odds: f64,
    pub best_draw_source: SourceId,
    pub best_away_odds: f64,
    pub best_away_source: SourceId,
    pub implied_probability: f64,
    pub profit_pct: f64,
    /// Every contributing bookmaker's prices
    pub quotes: BTreeMap<SourceId, Odds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingRow {
    pub home: String,
    pub away: Option<String>,
    pub kickoff: Option<String>,
    pub stake_home: f64,
    pub stake_draw: f64,
    pub stake_away: f64,
    pub profit_home: f64,
    pub profit_draw: f64,
    pub profit_away: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SureBetReport {
    pub generated_at: String,
    pub total_stake: f64,
    pub summary: Vec<SummaryRow>,
    pub detailed_staking: Vec<StakingRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

fn kickoff_text(kickoff: Option<NaiveDateTime>) -> Option<String> {
    kickoff.map(|k| k.format(KICKOFF_KEY_FORMAT).to_string())
}

impl SureBetReport {
    pub fn new(bets: &[SureBet], total_stake: f64, generated_at: DateTime<Local>) -> Self {
        let summary = bets
            .iter()
            .map(|bet| {
                let c = &bet.candidate;
                SummaryRow {
                    home: c.event.home.clone(),
                    away: c.event.away.clone(),
                    kickoff: kickoff_text(c.event.kickoff),
                    best_home_odds: c.best.home.odds,
                    best_home_source: c.best.home.source.clone(),
                    best_draw_odds: c.best.draw.odds,
                    best_draw_source: c.best.draw.source.clone(),
                    best_away_odds: c.best.away.odds,
                    best_away_source: c.best.away.source.clone(),
                    implied_probability: c.implied_probability,
                    profit_pct: c.edge_pct(),
                    quotes: c
                        .event
                        .contributing()
                        .map(|(source, odds)| (source.clone(), *odds))
                        .collect(),
                }
            })
            .collect();

        let detailed_staking = bets
            .iter()
            .map(|bet| {
                let event = &bet.candidate.event;
                StakingRow {
                    home: event.home.clone(),
                    away: event.away.clone(),
                    kickoff: kickoff_text(event.kickoff),
                    stake_home: bet.plan.stakes.home,
                    stake_draw: bet.plan.stakes.draw,
                    stake_away: bet.plan.stakes.away,
                    profit_home: bet.plan.profits.home,
                    profit_draw: bet.plan.profits.draw,
                    profit_away: bet.plan.profits.away,
                }
            })
            .collect();

        Self {
            generated_at: generated_at.to_rfc3339(),
            total_stake,
            summary,
            detailed_staking,
            diagnostics: None,
        }
    }

    /// Attach run diagnostics
    pub fn with_diagnostics(mut self, diagnostics: &Diagnostics) -> Result<Self, ReportError> {
        self.diagnostics = Some(serde_json::to_value(diagnostics)?);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }
}

/// Write the report into `output_dir`, creating it if needed. Returns the file path.
pub fn write_report(report: &SureBetReport, output_dir: &Path) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir).map_err(|source| ReportError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let path = output_dir.join(REPORT_FILE_NAME);
    let tmp = output_dir.join(format!("{REPORT_FILE_NAME}.tmp"));
    let content = serde_json::to_string_pretty(report)?;

    fs::write(&tmp, content).map_err(|source| ReportError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, &path).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        sure_bets = report.summary.len(),
        "Report written"
    );
    Ok(path)
}
