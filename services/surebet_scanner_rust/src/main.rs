use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use surebet_rust_core::archive::archive_all;
use surebet_rust_core::{run, write_report, RunOutcome, ScannerConfig, SureBet, SureBetReport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Surebet Scanner - find risk-free 1/X/2 combinations across bookmakers.
#[derive(Parser, Debug)]
#[command(name = "surebet_scanner")]
#[command(version, about, long_about = None)]
struct Args {
    /// Fuzzy matching threshold (0-100); overrides FUZZY_THRESHOLD
    #[arg(long)]
    threshold: Option<u8>,

    /// Total stake split across each sure bet; overrides TOTAL_STAKE
    #[arg(long)]
    total_stake: Option<f64>,

    /// Source directory (repeatable); overrides SOURCE_DIRS
    #[arg(long = "source-dir")]
    source_dirs: Vec<PathBuf>,

    /// Report directory; overrides OUTPUT_DIR
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Leave input files in place after the run
    #[arg(long)]
    no_archive: bool,
}

impl Args {
    fn apply(self, config: &mut ScannerConfig) {
        if let Some(threshold) = self.threshold {
            config.fuzzy_threshold = threshold;
        }
        if let Some(stake) = self.total_stake {
            config.total_stake = stake;
        }
        if !self.source_dirs.is_empty() {
            config.source_dirs = self.source_dirs;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.no_archive {
            config.archive_enabled = false;
        }
    }
}

fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Surebet Scanner...");

    let args = Args::parse();
    let mut config = ScannerConfig::from_env().context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    config.log_config();

    let started = Local::now();
    let result = run(&config);

    let bets: &[SureBet] = match &result.outcome {
        RunOutcome::SureBets(bets) => {
            info!(count = bets.len(), "Sure bets found");
            bets.as_slice()
        }
        RunOutcome::NoOpportunities { events_evaluated } => {
            info!(events_evaluated, "No sure bets in this snapshot");
            &[]
        }
        RunOutcome::InsufficientData { valid_sources } => {
            warn!(
                valid_sources,
                "Need at least two valid sources; no report written"
            );
            return Ok(());
        }
    };

    for bet in bets {
        info!(
            home = bet.candidate.event.home.as_str(),
            away = bet.candidate.event.away.as_deref().unwrap_or(""),
            implied = bet.candidate.implied_probability,
            profit = bet.plan.equal_profit(),
            "Sure bet"
        );
    }

    let report = SureBetReport::new(bets, config.total_stake, started)
        .with_diagnostics(&result.diagnostics)?;
    let path = write_report(&report, &config.output_dir).context("Failed to write report")?;
    info!(path = %path.display(), "Scan complete");

    if config.archive_enabled {
        archive_all(&result.loaded_paths, &config.archive_dir, Local::now());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "surebet_scanner",
            "--threshold",
            "90",
            "--total-stake",
            "250",
            "--source-dir",
            "/in/a",
            "--source-dir",
            "/in/b",
            "--no-archive",
        ]);
        let mut config = ScannerConfig::default();
        args.apply(&mut config);

        assert_eq!(config.fuzzy_threshold, 90);
        assert_eq!(config.total_stake, 250.0);
        assert_eq!(config.source_dirs, vec![PathBuf::from("/in/a"), PathBuf::from("/in/b")]);
        assert!(!config.archive_enabled);
        assert_eq!(config.output_dir, PathBuf::from("./results"));
    }

    #[test]
    fn test_no_flags_keep_env_config() {
        let args = Args::parse_from(["surebet_scanner"]);
        let mut config = ScannerConfig::default();
        args.apply(&mut config);
        assert_eq!(config.fuzzy_threshold, 80);
        assert!(config.archive_enabled);
    }

    #[test]
    fn test_cli_threshold_replaces_invalid_env_threshold() {
        std::env::set_var("FUZZY_THRESHOLD", "150");
        let loaded = ScannerConfig::from_env();
        std::env::remove_var("FUZZY_THRESHOLD");

        let mut config = loaded.unwrap();
        assert_eq!(config.fuzzy_threshold, 150);
        assert!(config.validate().is_err());

        Args::parse_from(["surebet_scanner", "--threshold", "80"]).apply(&mut config);
        assert_eq!(config.fuzzy_threshold, 80);
        assert!(config.validate().is_ok());
    }
}
