//! End-to-end scanner runs over temporary source directories.

use chrono::Local;
use std::fs;
use std::path::Path;
use surebet_rust_core::archive::archive_all;
use surebet_rust_core::loader::{discover_sources, load_sources};
use surebet_rust_core::{
    analyze, run, write_report, Odds, RunOutcome, ScannerConfig, SourceStatus, SureBetReport,
};
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> ScannerConfig {
    ScannerConfig {
        source_dirs: vec![dir.path().join("data")],
        output_dir: dir.path().join("results"),
        archive_dir: dir.path().join("archive"),
        load_workers: 2,
        ..Default::default()
    }
}

fn write_source(dir: &TempDir, name: &str, content: &str) {
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join(name), content).unwrap();
}

fn matched_pairs(config: &ScannerConfig) -> usize {
    let paths = discover_sources(&config.source_dirs);
    let loaded = load_sources(&paths, config);
    let (_, diagnostics) = analyze(&loaded.datasets, config);
    diagnostics
        .sources
        .iter()
        .map(|d| match &d.status {
            SourceStatus::Used { matching, .. } => matching.matched(),
            _ => 0,
        })
        .sum()
}

#[test]
fn test_worked_example_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "bookie_a.json",
        r#"[{"home": "Team X", "away": "Team Y", "1": 2.10, "x": 3.40, "2": 3.80, "time": "2025-03-01 20:45:00"}]"#,
    );
    write_source(
        &dir,
        "bookie_b.jsonl",
        r#"{"home": "X - Y", "1": "1,95", "x": "3,60", "2": "4,10", "kickoff": "01.03.2025 20:45"}"#,
    );
    let config = config_for(&dir);

    let result = run(&config);
    let bets = match &result.outcome {
        RunOutcome::SureBets(bets) => bets,
        other => panic!("expected sure bets, got {other:?}"),
    };
    assert_eq!(bets.len(), 1);

    let bet = &bets[0];
    assert_eq!(bet.candidate.event.home, "Team X");
    assert_eq!(bet.candidate.best_odds(), Odds::new(2.10, 3.60, 4.10));
    assert_eq!(bet.candidate.best.home.source, "bookie_a");
    assert_eq!(bet.candidate.best.away.source, "bookie_b");
    assert!((bet.candidate.implied_probability - 0.9979).abs() < 1e-4);

    let total: f64 = bet.plan.stakes.home + bet.plan.stakes.draw + bet.plan.stakes.away;
    assert!((total - 100.0).abs() < 1e-9);
    assert!((bet.plan.stakes.home - 47.72).abs() < 0.01);
    assert!((bet.plan.stakes.draw - 27.84).abs() < 0.01);
    assert!((bet.plan.stakes.away - 24.44).abs() < 0.01);
    for (_, profit) in bet.plan.profits.iter() {
        assert!((profit - 0.21).abs() < 0.01);
    }

    assert_eq!(result.diagnostics.valid_sources(), 2);
    assert_eq!(result.loaded_paths.len(), 2);

    let report = SureBetReport::new(bets, config.total_stake, Local::now());
    let path = write_report(&report, &config.output_dir).unwrap();
    assert!(path.exists());

    let archived = archive_all(&result.loaded_paths, &config.archive_dir, Local::now());
    assert_eq!(archived.len(), 2);
    assert!(discover_sources(&config.source_dirs).is_empty());
}

#[test]
fn test_abbreviated_team_name_still_forms_sure_bet() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "alpha.json",
        r#"[{"home": "Manchester United", "away": "Chelsea", "1": 2.10, "x": 3.40, "2": 3.80, "time": "2025-03-01 18:30"}]"#,
    );
    write_source(
        &dir,
        "beta.json",
        r#"[{"home": "Man Utd", "away": "Chelsea", "1": 1.95, "x": 3.60, "2": 4.10, "time": "2025-03-01 18:30"}]"#,
    );

    let result = run(&config_for(&dir));
    let bets = result.outcome.sure_bets();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].candidate.best_odds(), Odds::new(2.10, 3.60, 4.10));
    assert_eq!(bets[0].candidate.event.home, "Manchester United");
}

#[test]
fn test_lowest_odds_sum_duplicate_wins() {
    let dir = TempDir::new().unwrap();
    // The high-priced duplicate would form a sure bet if it were kept
    write_source(
        &dir,
        "alpha.json",
        r#"[
            {"home": "Arsenal", "away": "Chelsea", "1": 2.5, "x": 3.8, "2": 3.9, "time": "2025-03-01 18:00"},
            {"home": "Arsenal", "away": "Chelsea", "1": 2.0, "x": 3.3, "2": 3.5, "time": "2025-03-01 18:00"}
        ]"#,
    );
    write_source(
        &dir,
        "beta.json",
        r#"[{"home": "Arsenal", "away": "Chelsea", "1": 1.9, "x": 3.4, "2": 3.6, "time": "2025-03-01 18:00"}]"#,
    );

    let result = run(&config_for(&dir));
    assert_eq!(result.outcome, RunOutcome::NoOpportunities { events_evaluated: 1 });
}

#[test]
fn test_single_source_fixture_never_qualifies() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "alpha.json",
        r#"[
            {"home": "Partizan", "away": "Vojvodina", "1": 3.5, "x": 3.5, "2": 3.5, "time": "2025-03-01 18:00"},
            {"home": "Arsenal", "away": "Chelsea", "1": 2.0, "x": 3.3, "2": 3.5, "time": "2025-03-01 20:00"}
        ]"#,
    );
    write_source(
        &dir,
        "beta.json",
        r#"[{"home": "Arsenal", "away": "Chelsea", "1": 1.9, "x": 3.4, "2": 3.6, "time": "2025-03-01 20:00"}]"#,
    );

    let result = run(&config_for(&dir));
    assert_eq!(result.outcome, RunOutcome::NoOpportunities { events_evaluated: 1 });
    assert_eq!(result.diagnostics.merged_events, 2);
}

#[test]
fn test_insufficient_sources() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "alpha.json",
        r#"[{"home": "Arsenal", "away": "Chelsea", "1": 3.5, "x": 3.5, "2": 3.5, "time": "2025-03-01 18:00"}]"#,
    );
    write_source(&dir, "broken.json", "{not json");
    write_source(&dir, "nocols.json", r#"[{"team": "Arsenal", "price": 2.0}]"#);

    let result = run(&config_for(&dir));
    assert_eq!(result.outcome, RunOutcome::InsufficientData { valid_sources: 1 });

    let statuses: Vec<(&str, &SourceStatus)> = result
        .diagnostics
        .sources
        .iter()
        .map(|d| (d.source.as_str(), &d.status))
        .collect();
    assert_eq!(statuses.len(), 3);
    assert!(matches!(statuses[0], ("alpha", SourceStatus::Used { .. })));
    assert!(matches!(statuses[1], ("broken", SourceStatus::LoadFailed { .. })));
    assert!(matches!(statuses[2], ("nocols", SourceStatus::NormalizeFailed { .. })));
}

#[test]
fn test_excluded_source_is_reported() {
    let dir = TempDir::new().unwrap();
    let row = r#"[{"home": "Arsenal", "away": "Chelsea", "1": 2.0, "x": 3.3, "2": 3.5, "time": "2025-03-01 18:00"}]"#;
    write_source(&dir, "alpha.json", row);
    write_source(&dir, "beta.json", row);
    write_source(&dir, "betole_live.json", row);

    let config = ScannerConfig {
        excluded_sources: vec!["betole".to_string()],
        ..config_for(&dir)
    };
    let result = run(&config);

    assert_eq!(result.loaded_paths.len(), 2);
    assert!(result
        .diagnostics
        .sources
        .iter()
        .any(|d| d.source == "betole_live" && d.status == SourceStatus::Excluded));
}

#[test]
fn test_split_layout_with_source_quirks() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "sportplus.json",
        r#"{"columns": ["home", "away", "1.00", "x", "2.00", "kickoff", "time"],
            "data": [["Roma", "Lazio", 2.6, 3.3, 3.1, "2025-03-02 20:45", "20:45"]]}"#,
    );
    write_source(
        &dir,
        "mozzart.json",
        r#"[{"home": "AS Roma", "away": "Lazio", "1": 2.2, "x": 3.9, "2": 3.3, "time": "2025-03-02T20:45:00+01:00"}]"#,
    );

    let result = run(&config_for(&dir));
    let bets = result.outcome.sure_bets();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].candidate.best_odds(), Odds::new(2.6, 3.9, 3.3));
    assert_eq!(bets[0].candidate.event.home, "AS Roma");
}

#[test]
fn test_higher_threshold_never_adds_matches() {
    let dir = TempDir::new().unwrap();
    write_source(
        &dir,
        "alpha.json",
        r#"[
            {"home": "Manchester United", "away": "Chelsea", "1": 2.0, "x": 3.4, "2": 3.6, "time": "2025-03-01 18:30"},
            {"home": "Inter", "away": "Milan", "1": 2.4, "x": 3.1, "2": 3.0, "time": "2025-03-01 20:45"},
            {"home": "Ajax", "away": "PSV", "1": 2.1, "x": 3.6, "2": 3.2, "time": "2025-03-02 14:30"}
        ]"#,
    );
    write_source(
        &dir,
        "beta.json",
        r#"[
            {"home": "Manchester Utd", "away": "Chelsea FC", "1": 2.1, "x": 3.3, "2": 3.5, "time": "2025-03-01 18:30"},
            {"home": "Internazionale", "away": "AC Milan", "1": 2.3, "x": 3.2, "2": 3.1, "time": "2025-03-01 20:45"},
            {"home": "Ajax Amsterdam", "away": "PSV", "1": 2.0, "x": 3.7, "2": 3.3, "time": "2025-03-02 14:30"}
        ]"#,
    );

    let mut previous = usize::MAX;
    for threshold in [0u8, 40, 60, 80, 90, 95, 100] {
        let config = ScannerConfig {
            fuzzy_threshold: threshold,
            ..config_for(&dir)
        };
        let matched = matched_pairs(&config);
        assert!(
            matched <= previous,
            "threshold {threshold} matched {matched} > {previous}"
        );
        previous = matched;
    }
}

#[test]
fn test_missing_source_dir_yields_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    assert!(!Path::new(&config.source_dirs[0]).exists());
    let result = run(&config);
    assert_eq!(result.outcome, RunOutcome::InsufficientData { valid_sources: 0 });
    assert!(result.loaded_paths.is_empty());
}
