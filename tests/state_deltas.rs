use chrono::{DateTime, Duration, Utc};

use matchday_terminal::config::AppConfig;
use matchday_terminal::live_clock::{ClockBoard, ClockDisplay, MatchStatus};
use matchday_terminal::state::{
    AppState, ClubSheet, Delta, MatchDetail, MatchSummary, PersonKind, Screen, SortMode,
    StandingRow, TeamRef, apply_delta_at,
};

fn phase_start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_800_000, 0).expect("valid timestamp")
}

fn team(id: u32, name: &str, tla: &str) -> TeamRef {
    TeamRef {
        id: Some(id),
        name: name.to_string(),
        short_name: tla.to_string(),
    }
}

fn summary(id: &str, status: MatchStatus, kickoff: &str) -> MatchSummary {
    MatchSummary {
        id: id.to_string(),
        competition: "PL".to_string(),
        matchday: Some(12),
        kickoff: kickoff.to_string(),
        status,
        minute: None,
        phase_start_ms: None,
        phase_offset: None,
        home: team(57, "Arsenal FC", "ARS"),
        away: team(61, "Chelsea FC", "CHE"),
        score_home: None,
        score_away: None,
    }
}

fn live(id: &str, home: u8, away: u8) -> MatchSummary {
    MatchSummary {
        minute: Some(20),
        phase_start_ms: Some(phase_start().timestamp_millis()),
        phase_offset: Some(0),
        score_home: Some(home),
        score_away: Some(away),
        ..summary(id, MatchStatus::Live, "2026-10-17T11:30")
    }
}

fn set_matches(state: &mut AppState, matches: Vec<MatchSummary>, now: DateTime<Utc>) {
    apply_delta_at(
        state,
        Delta::SetMatches {
            competition: "PL".to_string(),
            matches,
            stale: false,
        },
        now,
    );
}

#[test]
fn other_competition_deltas_are_ignored() {
    let mut state = AppState::new();
    apply_delta_at(
        &mut state,
        Delta::SetMatches {
            competition: "BL1".to_string(),
            matches: vec![summary("1", MatchStatus::Scheduled, "2026-10-17T14:00")],
            stale: false,
        },
        phase_start(),
    );
    assert!(state.matches.is_empty());

    let mut foreign = summary("2", MatchStatus::Scheduled, "2026-10-17T14:00");
    foreign.competition = "BL1".to_string();
    apply_delta_at(&mut state, Delta::UpsertMatch(foreign), phase_start());
    assert!(state.matches.is_empty());
}

#[test]
fn live_matches_get_a_running_clock() {
    let mut state = AppState::new();
    let now = phase_start() + Duration::minutes(20) + Duration::seconds(30);
    set_matches(&mut state, vec![live("1", 0, 0)], now);
    assert_eq!(state.clock_display("1"), ClockDisplay::Running(20));

    assert!(state.tick_clocks(phase_start() + Duration::minutes(21)));
    assert_eq!(state.clock_display("1"), ClockDisplay::Running(21));
    assert_eq!(state.live_match_ids(), vec!["1".to_string()]);
}

#[test]
fn goal_and_status_changes_are_logged() {
    let mut state = AppState::new();
    let now = phase_start() + Duration::minutes(23);
    set_matches(
        &mut state,
        vec![summary("1", MatchStatus::Scheduled, "2026-10-17T11:30")],
        phase_start(),
    );
    apply_delta_at(&mut state, Delta::UpsertMatch(live("1", 0, 0)), now);
    apply_delta_at(&mut state, Delta::UpsertMatch(live("1", 1, 0)), now);

    let logs: Vec<&String> = state.logs.iter().collect();
    assert!(logs.iter().any(|l| l.as_str() == "[INFO] Kick-off: ARS v CHE"));
    assert!(
        logs.iter()
            .any(|l| l.as_str() == "[ALERT] Goal 23': ARS (ARS 1-0 CHE)"),
        "{logs:?}"
    );

    let mut half_time = live("1", 1, 0);
    half_time.status = MatchStatus::Paused;
    half_time.phase_start_ms = None;
    apply_delta_at(&mut state, Delta::UpsertMatch(half_time), now);
    assert_eq!(state.clock_display("1"), ClockDisplay::Break);
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[INFO] Half-time: ARS v CHE 1-0")
    );
}

#[test]
fn selection_follows_match_across_resort() {
    let mut state = AppState::new();
    state.sort = SortMode::Kickoff;
    set_matches(
        &mut state,
        vec![
            summary("a", MatchStatus::Scheduled, "2026-10-17T12:00"),
            summary("b", MatchStatus::Scheduled, "2026-10-17T14:00"),
        ],
        phase_start(),
    );
    state.select_next();
    assert_eq!(state.selected_match_id().as_deref(), Some("b"));

    set_matches(
        &mut state,
        vec![
            summary("c", MatchStatus::Scheduled, "2026-10-17T09:00"),
            summary("a", MatchStatus::Scheduled, "2026-10-17T12:00"),
            summary("b", MatchStatus::Scheduled, "2026-10-17T14:00"),
        ],
        phase_start(),
    );
    assert_eq!(state.selected_match_id().as_deref(), Some("b"));
    assert_eq!(state.matches_selected, 2);
}

#[test]
fn live_first_sort_puts_running_matches_on_top() {
    let mut state = AppState::new();
    assert_eq!(state.sort, SortMode::LiveFirst);
    set_matches(
        &mut state,
        vec![
            summary("done", MatchStatus::Finished, "2026-10-10T14:00"),
            summary("later", MatchStatus::Scheduled, "2026-10-18T14:00"),
            live("now", 0, 0),
        ],
        phase_start() + Duration::minutes(20),
    );
    let order: Vec<&str> = state.matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(order, vec!["now", "later", "done"]);
}

#[test]
fn dropped_matches_lose_their_clocks() {
    let mut state = AppState::new();
    let now = phase_start() + Duration::minutes(20);
    set_matches(&mut state, vec![live("1", 0, 0), live("2", 0, 0)], now);
    assert_eq!(state.clocks.len(), 2);

    set_matches(&mut state, vec![live("2", 0, 0)], now);
    assert_eq!(state.matches.len(), 1);
    assert_eq!(state.clocks.len(), 1);
    assert_eq!(state.clock_display("1"), ClockDisplay::Hidden);
}

#[test]
fn stale_matches_are_flagged_once() {
    let mut state = AppState::new();
    for _ in 0..2 {
        apply_delta_at(
            &mut state,
            Delta::SetMatches {
                competition: "PL".to_string(),
                matches: vec![summary("1", MatchStatus::Scheduled, "2026-10-17T14:00")],
                stale: true,
            },
            phase_start(),
        );
    }
    assert!(state.matches_stale);
    let offline = state
        .logs
        .iter()
        .filter(|l| l.contains("Offline"))
        .count();
    assert_eq!(offline, 1);
}

#[test]
fn offline_matches_do_not_start_clocks() {
    let mut state = AppState::new();
    let mut yesterday = live("1", 1, 0);
    yesterday.phase_start_ms = Some((phase_start() - Duration::days(1)).timestamp_millis());
    apply_delta_at(
        &mut state,
        Delta::SetMatches {
            competition: "PL".to_string(),
            matches: vec![yesterday],
            stale: true,
        },
        phase_start(),
    );
    assert_eq!(state.matches.len(), 1);
    assert_eq!(state.clock_display("1"), ClockDisplay::Hidden);
    assert!(state.clocks.is_empty());

    // A running clock keeps its baseline through an offline refresh.
    let now = phase_start() + Duration::minutes(20);
    set_matches(&mut state, vec![live("1", 0, 0)], now);
    assert_eq!(state.clock_display("1"), ClockDisplay::Running(20));
    let mut cached = live("1", 0, 0);
    cached.phase_start_ms = Some((phase_start() - Duration::days(1)).timestamp_millis());
    apply_delta_at(
        &mut state,
        Delta::SetMatches {
            competition: "PL".to_string(),
            matches: vec![cached],
            stale: true,
        },
        now + Duration::minutes(1),
    );
    assert!(state.tick_clocks(now + Duration::minutes(1)));
    assert_eq!(state.clock_display("1"), ClockDisplay::Running(21));
}

#[test]
fn detail_summary_updates_list_and_stores_detail() {
    let mut state = AppState::new();
    set_matches(
        &mut state,
        vec![summary("1", MatchStatus::Scheduled, "2026-10-17T11:30")],
        phase_start(),
    );
    apply_delta_at(
        &mut state,
        Delta::SetMatchDetail {
            id: "1".to_string(),
            summary: Some(live("1", 0, 0)),
            detail: MatchDetail {
                venue: Some("Emirates Stadium".to_string()),
                ..MatchDetail::default()
            },
        },
        phase_start() + Duration::minutes(20),
    );
    assert_eq!(state.matches[0].status, MatchStatus::Live);
    assert_eq!(
        state.match_detail["1"].venue.as_deref(),
        Some("Emirates Stadium")
    );
}

#[test]
fn navigation_keeps_a_back_stack() {
    let mut state = AppState::new();
    set_matches(
        &mut state,
        vec![summary("1", MatchStatus::Scheduled, "2026-10-17T11:30")],
        phase_start(),
    );

    let target = state.selected_target().expect("match target");
    state.open(target);
    assert_eq!(
        state.screen,
        Screen::Match {
            match_id: "1".to_string()
        }
    );

    state.open(Screen::Club { club_id: 57 });
    apply_delta_at(
        &mut state,
        Delta::SetClub(ClubSheet {
            id: 57,
            name: "Arsenal FC".to_string(),
            short_name: "ARS".to_string(),
            tla: Some("ARS".to_string()),
            founded: None,
            venue: None,
            colors: None,
            website: None,
            address: None,
            squad: Vec::new(),
            staff: vec![matchday_terminal::state::StaffMember {
                id: Some(900),
                name: "Mikel Arteta".to_string(),
                role: "Head Coach".to_string(),
                nationality: None,
            }],
        }),
        phase_start(),
    );
    assert_eq!(
        state.selected_target(),
        Some(Screen::Person {
            person_id: 900,
            kind: PersonKind::Staff
        })
    );

    state.back();
    assert!(matches!(state.screen, Screen::Match { .. }));
    state.back();
    assert_eq!(state.screen, Screen::Matches);
    state.back();
    assert_eq!(state.screen, Screen::Matches);
}

#[test]
fn standings_select_a_club() {
    let mut state = AppState::new();
    apply_delta_at(
        &mut state,
        Delta::SetStandings {
            competition: "PL".to_string(),
            rows: vec![StandingRow {
                position: 1,
                team: team(57, "Arsenal FC", "ARS"),
                played: 11,
                won: 8,
                draw: 2,
                lost: 1,
                goals_for: 22,
                goals_against: 8,
                goal_difference: 14,
                points: 26,
                form: None,
            }],
        },
        phase_start(),
    );
    state.show_tab(Screen::Standings);
    assert_eq!(state.selected_target(), Some(Screen::Club { club_id: 57 }));
}

#[test]
fn cycling_competition_clears_lists() {
    let config = AppConfig {
        competitions: vec!["PL".to_string(), "BL1".to_string()],
        ..AppConfig::default()
    };
    let mut state = AppState::with_clocks(&config, ClockBoard::in_memory());
    set_matches(
        &mut state,
        vec![live("1", 0, 0)],
        phase_start() + Duration::minutes(20),
    );
    state.cycle_competition();
    assert_eq!(state.competition(), "BL1");
    assert!(state.matches.is_empty());
    assert!(state.clocks.is_empty());
    assert_eq!(state.screen, Screen::Matches);
}
