use std::fs;
use std::path::PathBuf;

use matchday_terminal::api::{
    parse_club_json, parse_match_detail_json, parse_matches_json, parse_person_json,
    parse_scorers_json, parse_standings_json,
};
use matchday_terminal::live_clock::MatchStatus;
use matchday_terminal::state::{EventKind, PersonKind};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_matches_fixture() {
    let raw = read_fixture("matches.json");
    let rows = parse_matches_json(&raw, "PL").expect("fixture should parse");
    assert_eq!(rows.len(), 3, "other competitions are dropped");

    let live = rows.iter().find(|m| m.id == "4101").expect("live match");
    assert_eq!(live.status, MatchStatus::Live);
    assert_eq!(live.minute, Some(47));
    assert_eq!(live.phase_offset, Some(0));
    assert!(live.phase_start_ms.is_some());
    assert_eq!(live.home.label(), "ARS");
    assert_eq!(live.away.id, Some(61));
    assert_eq!(live.score_label(), "1-0");
    assert_eq!(live.kickoff, "2026-10-17T11:30");
    assert_eq!(live.competition, "PL");

    let upcoming = rows.iter().find(|m| m.id == "4102").expect("string ids");
    assert_eq!(upcoming.status, MatchStatus::Scheduled);
    assert_eq!(upcoming.score_label(), "-");
    assert_eq!(upcoming.away.label(), "LIV");

    let finished = rows.iter().find(|m| m.id == "4103").expect("finished match");
    assert_eq!(finished.status, MatchStatus::Finished);
    assert_eq!(finished.minute, Some(94));
}

#[test]
fn live_snapshot_reconstructs_from_phase_start() {
    let raw = read_fixture("matches.json");
    let rows = parse_matches_json(&raw, "PL").expect("fixture should parse");
    let live = rows.iter().find(|m| m.id == "4101").expect("live match");
    let snapshot = live.clock_snapshot();
    let start = snapshot.phase_start.expect("phase start");
    assert_eq!(start.to_rfc3339(), "2026-10-17T11:30:00+00:00");
    assert_eq!(snapshot.phase_offset, Some(0));
}

#[test]
fn parses_match_detail_fixture() {
    let raw = read_fixture("match_detail.json");
    let parsed = parse_match_detail_json(&raw).expect("fixture should parse");

    let summary = parsed.summary.expect("summary");
    assert_eq!(summary.id, "4101");
    assert_eq!(summary.status, MatchStatus::Paused);

    let detail = parsed.detail;
    assert_eq!(detail.venue.as_deref(), Some("Emirates Stadium"));
    assert_eq!(detail.referee.as_deref(), Some("Michael Oliver"));

    let kinds: Vec<EventKind> = detail.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Goal, EventKind::Card, EventKind::Sub]);
    assert_eq!(detail.events[0].team, "ARS");
    assert_eq!(detail.events[0].description, "Goal Bukayo Saka");
    assert_eq!(detail.events[1].description, "yellow card Moisés Caicedo");
    assert_eq!(detail.events[2].extra_minute, Some(1));
    assert_eq!(detail.events[2].description, "Sub Pedro Neto for Noni Madueke");

    let lineups = detail.lineups.expect("lineups");
    assert_eq!(lineups.sides.len(), 2);
    assert_eq!(lineups.sides[0].formation, "4-3-3");
    assert_eq!(lineups.sides[0].starting.len(), 2);
    assert_eq!(lineups.sides[0].starting[0].number, Some(22));
    assert_eq!(lineups.sides[0].subs.len(), 1);

    let corners = detail
        .stats
        .iter()
        .find(|s| s.name == "Corners")
        .expect("corners stat");
    assert_eq!((corners.home.as_str(), corners.away.as_str()), ("5", "2"));
    assert!(detail.stats.iter().any(|s| s.name == "Ball possession"));
}

#[test]
fn standings_use_total_table() {
    let raw = read_fixture("standings.json");
    let rows = parse_standings_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].team.name, "Arsenal FC");
    assert_eq!(rows[0].points, 26);
    assert_eq!(rows[0].goal_difference, 14, "derived when missing");
    assert_eq!(rows[1].form.as_deref(), Some("W,W,D,L,W"));
    assert!(rows.iter().all(|row| row.team.id != Some(99)));
}

#[test]
fn standings_without_a_table_are_empty() {
    let rows = parse_standings_json(r#"{"competition": {"code": "PL"}}"#).expect("object");
    assert!(rows.is_empty());
    let rows = parse_standings_json(r#"{"standings": "soon"}"#).expect("non-array table");
    assert!(rows.is_empty());
}

#[test]
fn scorers_sorted_by_goals_then_assists() {
    let raw = read_fixture("scorers.json");
    let rows = parse_scorers_json(&raw).expect("fixture should parse");
    let names: Vec<&str> = rows.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(names, vec!["Erling Haaland", "Bukayo Saka", "Cole Palmer"]);
    assert_eq!(rows[0].goals, 12);
    assert_eq!(rows[0].player_id, Some(9));
    assert_eq!(rows[0].team.label(), "MCI");
    assert_eq!(rows[2].penalties, Some(3));
}

#[test]
fn parses_club_fixture() {
    let raw = read_fixture("club.json");
    let club = parse_club_json(&raw).expect("fixture should parse");
    assert_eq!(club.id, 57);
    assert_eq!(club.founded, Some(1886));
    assert_eq!(club.colors.as_deref(), Some("Red / White"));
    assert_eq!(club.squad.len(), 2);
    assert_eq!(club.squad[1].shirt_number, Some(7));
    assert_eq!(club.staff.len(), 2);
    assert_eq!(club.staff[0].name, "Mikel Arteta");
    assert_eq!(club.staff[0].role, "Head Coach");

    let people = club.people();
    assert_eq!(people.len(), 4);
    assert_eq!(people[0].0, PersonKind::Player);
    assert_eq!(people[2].0, PersonKind::Staff);
    assert_eq!(people[2].1, Some(900));
}

#[test]
fn parses_player_fixture() {
    let raw = read_fixture("player.json");
    let person = parse_person_json(&raw, PersonKind::Player).expect("fixture should parse");
    assert_eq!(person.id, 7);
    assert_eq!(person.name, "Bukayo Saka");
    assert_eq!(person.shirt_number, Some(7));
    assert_eq!(person.team.as_ref().map(|t| t.label()), Some("ARS"));

    let goals = person
        .stats
        .iter()
        .find(|s| s.label == "Goals")
        .expect("goals stat");
    assert_eq!(goals.value, "8");
    assert!(person.stats.iter().any(|s| s.label == "Yellow cards"));
    assert!(
        person
            .stats
            .iter()
            .any(|s| s.label == "Injured" && s.value == "no")
    );
}

#[test]
fn empty_bodies_are_not_errors() {
    assert!(parse_matches_json("", "PL").expect("empty").is_empty());
    assert!(parse_standings_json("null").expect("null").is_empty());
    assert!(parse_scorers_json("[]").expect("array").is_empty());
    assert!(parse_club_json("{}").is_err(), "club needs an id");
}
