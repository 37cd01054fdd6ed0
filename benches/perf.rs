use chrono::{DateTime, Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchday_terminal::api::{parse_match_detail_json, parse_matches_json, parse_standings_json};
use matchday_terminal::live_clock::{ClockBoard, ClockSnapshot, MatchStatus};
use matchday_terminal::state::{AppState, Delta, apply_delta_at};

fn phase_start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_800_000, 0).unwrap()
}

fn live_board(count: usize) -> ClockBoard {
    let mut board = ClockBoard::in_memory();
    let now = phase_start() + Duration::minutes(30);
    for idx in 0..count {
        let snapshot = ClockSnapshot::new(MatchStatus::Live)
            .with_minute(29)
            .with_phase(phase_start() - Duration::seconds(idx as i64), 0);
        board.sync(&format!("m{idx}"), &snapshot, now);
    }
    board
}

fn bench_clock_tick_all(c: &mut Criterion) {
    let mut board = live_board(64);
    let mut now = phase_start() + Duration::minutes(30);
    c.bench_function("clock_tick_all", |b| {
        b.iter(|| {
            now += Duration::seconds(1);
            black_box(board.tick_all(black_box(now)));
        })
    });
}

fn bench_clock_resync(c: &mut Criterion) {
    let mut board = live_board(64);
    let mut minute = 30u16;
    c.bench_function("clock_resync", |b| {
        b.iter(|| {
            minute = if minute >= 120 { 30 } else { minute + 1 };
            let snapshot = ClockSnapshot::new(MatchStatus::Live).with_minute(minute);
            let now = phase_start() + Duration::minutes(i64::from(minute));
            black_box(board.sync("m0", black_box(&snapshot), now));
        })
    });
}

fn bench_matches_parse(c: &mut Criterion) {
    c.bench_function("matches_parse", |b| {
        b.iter(|| {
            let rows = parse_matches_json(black_box(MATCHES_JSON), "PL").unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_match_detail_parse(c: &mut Criterion) {
    c.bench_function("match_detail_parse", |b| {
        b.iter(|| {
            let parsed = parse_match_detail_json(black_box(MATCH_DETAIL_JSON)).unwrap();
            black_box(parsed.detail.events.len());
        })
    });
}

fn bench_standings_parse(c: &mut Criterion) {
    c.bench_function("standings_parse", |b| {
        b.iter(|| {
            let rows = parse_standings_json(black_box(STANDINGS_JSON)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_apply_matches_delta(c: &mut Criterion) {
    let matches = parse_matches_json(MATCHES_JSON, "PL").unwrap();
    let now = phase_start() + Duration::minutes(30);
    c.bench_function("apply_matches_delta", |b| {
        b.iter(|| {
            let mut state = AppState::new();
            apply_delta_at(
                &mut state,
                Delta::SetMatches {
                    competition: "PL".to_string(),
                    matches: matches.clone(),
                    stale: false,
                },
                now,
            );
            black_box(state.matches.len());
        })
    });
}

criterion_group!(
    perf,
    bench_clock_tick_all,
    bench_clock_resync,
    bench_matches_parse,
    bench_match_detail_parse,
    bench_standings_parse,
    bench_apply_matches_delta
);
criterion_main!(perf);

static MATCHES_JSON: &str = include_str!("../tests/fixtures/matches.json");
static MATCH_DETAIL_JSON: &str = include_str!("../tests/fixtures/match_detail.json");
static STANDINGS_JSON: &str = include_str!("../tests/fixtures/standings.json");
