use std::fs;
use std::path::PathBuf;

use matchday_terminal::config::AppConfig;
use matchday_terminal::live_clock::{ClockBoard, ClockDisplay, MatchStatus};
use matchday_terminal::persist::{load_into_state_from, save_from_state_to};
use matchday_terminal::state::{AppState, MatchSummary, ScorerRow, TeamRef};

fn temp_cache(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("matchday_terminal_persist_{}_{name}", std::process::id()));
    path.push("cache.json");
    path
}

fn team(name: &str, tla: &str) -> TeamRef {
    TeamRef {
        id: None,
        name: name.to_string(),
        short_name: tla.to_string(),
    }
}

fn live_match() -> MatchSummary {
    MatchSummary {
        id: "4101".to_string(),
        competition: "PL".to_string(),
        matchday: Some(12),
        kickoff: "2026-10-17T11:30".to_string(),
        status: MatchStatus::Live,
        minute: Some(30),
        phase_start_ms: Some(1_800_000_000),
        phase_offset: Some(0),
        home: team("Arsenal FC", "ARS"),
        away: team("Chelsea FC", "CHE"),
        score_home: Some(1),
        score_away: Some(0),
    }
}

#[test]
fn snapshot_round_trips_per_competition() {
    let path = temp_cache("round_trip");
    let _ = fs::remove_file(&path);

    let mut state = AppState::new();
    state.matches.push(live_match());
    state.matches_fetched_at = Some(std::time::SystemTime::now());
    state.scorers.push(ScorerRow {
        player_id: Some(9),
        player: "Erling Haaland".to_string(),
        team: team("Manchester City FC", "MCI"),
        goals: 12,
        assists: None,
        penalties: None,
        played: Some(10),
    });
    save_from_state_to(&state, &path);

    let mut restored = AppState::new();
    load_into_state_from(&mut restored, &path);
    assert_eq!(restored.matches, state.matches);
    assert_eq!(restored.scorers, state.scorers);
    assert!(restored.matches_stale, "cached rows are flagged until refreshed");
    assert!(restored.matches_fetched_at.is_some());
    // Cached snapshots never start clocks.
    assert_eq!(restored.clock_display("4101"), ClockDisplay::Hidden);

    let config = AppConfig {
        competitions: vec!["BL1".to_string()],
        ..AppConfig::default()
    };
    let mut other = AppState::with_clocks(&config, ClockBoard::in_memory());
    load_into_state_from(&mut other, &path);
    assert!(other.matches.is_empty());

    let _ = fs::remove_file(&path);
}

#[test]
fn missing_or_corrupt_cache_is_ignored() {
    let path = temp_cache("corrupt");
    let mut state = AppState::new();
    load_into_state_from(&mut state, &path);
    assert!(state.matches.is_empty());

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).expect("temp dir");
    }
    fs::write(&path, "{not json").expect("write corrupt cache");
    load_into_state_from(&mut state, &path);
    assert!(state.matches.is_empty());

    // Saving over a corrupt file replaces it.
    state.matches.push(live_match());
    save_from_state_to(&state, &path);
    let mut restored = AppState::new();
    load_into_state_from(&mut restored, &path);
    assert_eq!(restored.matches.len(), 1);

    let _ = fs::remove_file(&path);
}
