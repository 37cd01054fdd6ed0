//! Offline matchday simulation. Matches walk through real-time halves and a
//! half-time break; snapshots are sent only now and then, so the UI clocks
//! have to estimate the minutes in between.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::live_clock::{MatchStatus, SECOND_HALF_OFFSET};
use crate::state::{
    ClubSheet, Delta, Event, EventKind, MatchDetail, MatchSummary, PersonKind, PersonSheet,
    PersonStat, ProviderCommand, ScorerRow, SquadMember, StaffMember, StandingRow, StatRow,
    TeamRef,
};

const HALF_MINUTES: i64 = 45;
const BREAK_MINUTES: i64 = 15;
// Per second per team; roughly 1.35 goals per team per 90 minutes.
const GOAL_CHANCE_PER_SEC: f64 = 1.35 / 5_400.0;

const CLUBS: [(&str, &str); 12] = [
    ("Northbridge United", "NBU"),
    ("Harbor City", "HBC"),
    ("Red Valley Rovers", "RVR"),
    ("Kingsport Athletic", "KSA"),
    ("Eastmoor Wanderers", "EMW"),
    ("Castleford Town", "CFT"),
    ("Silverlake Albion", "SLA"),
    ("Westfield Rangers", "WFR"),
    ("Oakham Borough", "OAK"),
    ("Riverside Olympic", "RSO"),
    ("Millbrook Forest", "MBF"),
    ("Ashby Palace", "ASP"),
];

const FIRST_NAMES: [&str; 12] = [
    "Leo", "Marco", "Sam", "Theo", "Jonas", "Luca", "Ruben", "Adam", "Niko", "Omar", "Felix",
    "Dani",
];
const LAST_NAMES: [&str; 12] = [
    "Hale", "Moreno", "Okafor", "Lindqvist", "Brandt", "Costa", "Reyes", "Kowalski", "Duarte",
    "Sato", "Mensah", "Fischer",
];
const POSITIONS: [&str; 4] = ["Goalkeeper", "Defence", "Midfield", "Offence"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPhase {
    pub status: MatchStatus,
    pub minute: Option<u16>,
    pub phase_start: Option<DateTime<Utc>>,
    pub phase_offset: Option<u16>,
}

/// Where a match with the given kickoff and stoppage minutes stands at `now`.
pub fn phase_at(
    kickoff: DateTime<Utc>,
    first_half_extra: i64,
    second_half_extra: i64,
    now: DateTime<Utc>,
) -> SimPhase {
    let elapsed_secs = (now - kickoff).num_seconds();
    let first_half_end = (HALF_MINUTES + first_half_extra) * 60;
    let second_half_start = first_half_end + BREAK_MINUTES * 60;
    let second_half_end = second_half_start + (HALF_MINUTES + second_half_extra) * 60;

    if elapsed_secs < 0 {
        return SimPhase {
            status: MatchStatus::Scheduled,
            minute: None,
            phase_start: None,
            phase_offset: None,
        };
    }
    if elapsed_secs < first_half_end {
        return SimPhase {
            status: MatchStatus::Live,
            minute: Some((elapsed_secs / 60) as u16),
            phase_start: Some(kickoff),
            phase_offset: Some(0),
        };
    }
    if elapsed_secs < second_half_start {
        return SimPhase {
            status: MatchStatus::Paused,
            minute: Some(HALF_MINUTES as u16),
            phase_start: None,
            phase_offset: None,
        };
    }
    if elapsed_secs < second_half_end {
        let into_half = elapsed_secs - second_half_start;
        return SimPhase {
            status: MatchStatus::Live,
            minute: Some(SECOND_HALF_OFFSET + (into_half / 60) as u16),
            phase_start: Some(kickoff + ChronoDuration::seconds(second_half_start)),
            phase_offset: Some(SECOND_HALF_OFFSET),
        };
    }
    SimPhase {
        status: MatchStatus::Finished,
        minute: Some((2 * HALF_MINUTES + second_half_extra) as u16),
        phase_start: None,
        phase_offset: None,
    }
}

#[derive(Debug, Clone)]
struct SimMatch {
    id: String,
    home: usize,
    away: usize,
    kickoff: DateTime<Utc>,
    first_half_extra: i64,
    second_half_extra: i64,
    // Some backends only send a raw minute; exercise both paths.
    publishes_phase: bool,
    score_home: u8,
    score_away: u8,
    goals: Vec<Event>,
    last_status: Option<MatchStatus>,
    last_report: Option<Instant>,
    report_every: Duration,
}

pub fn spawn_fake_provider(
    competition: String,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let mut competition = competition;
        let mut matches = seed_matches(&competition, Utc::now(), &mut rng);
        let mut last_second = Instant::now();

        let _ = tx.send(Delta::Log(format!(
            "[INFO] Simulated feed: {} fixtures for {competition}",
            matches.len()
        )));
        send_all(&tx, &competition, &matches, Utc::now());

        loop {
            thread::sleep(Duration::from_millis(900));
            let now = Utc::now();

            if last_second.elapsed() >= Duration::from_secs(1) {
                last_second = Instant::now();
                for sim in &mut matches {
                    maybe_score(sim, now, &mut rng);
                }
            }

            for sim in &mut matches {
                let phase = phase_at(sim.kickoff, sim.first_half_extra, sim.second_half_extra, now);
                let status_changed = sim.last_status != Some(phase.status);
                let due = sim
                    .last_report
                    .is_none_or(|last| last.elapsed() >= sim.report_every);
                if status_changed || (phase.status.in_progress() && due) {
                    sim.last_status = Some(phase.status);
                    sim.last_report = Some(Instant::now());
                    sim.report_every = Duration::from_secs(rng.gen_range(20..75));
                    let mut summary = summary_of(sim, &competition, phase);
                    // Raw minutes lag behind now and then.
                    if phase.status.is_live() && rng.gen_bool(0.3) {
                        summary.minute = summary.minute.map(|m| m.saturating_sub(1));
                    }
                    let _ = tx.send(Delta::UpsertMatch(summary));
                }
            }

            loop {
                match cmd_rx.try_recv() {
                    Ok(ProviderCommand::SetCompetition { code }) => {
                        competition = code;
                        matches = seed_matches(&competition, Utc::now(), &mut rng);
                        send_all(&tx, &competition, &matches, Utc::now());
                    }
                    Ok(cmd) => handle_command(cmd, &tx, &competition, &matches),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
        }
    })
}

fn send_all(tx: &Sender<Delta>, competition: &str, matches: &[SimMatch], now: DateTime<Utc>) {
    let summaries = matches
        .iter()
        .map(|sim| {
            let phase = phase_at(sim.kickoff, sim.first_half_extra, sim.second_half_extra, now);
            summary_of(sim, competition, phase)
        })
        .collect();
    let _ = tx.send(Delta::SetMatches {
        competition: competition.to_string(),
        matches: summaries,
        stale: false,
    });
}

fn handle_command(
    cmd: ProviderCommand,
    tx: &Sender<Delta>,
    competition: &str,
    matches: &[SimMatch],
) {
    let now = Utc::now();
    match cmd {
        ProviderCommand::RefreshMatches => send_all(tx, competition, matches, now),
        ProviderCommand::FetchMatchDetail { match_id } => {
            let Some(sim) = matches.iter().find(|m| m.id == match_id) else {
                let _ = tx.send(Delta::Log(format!("[WARN] Unknown match {match_id}")));
                return;
            };
            let phase = phase_at(sim.kickoff, sim.first_half_extra, sim.second_half_extra, now);
            let _ = tx.send(Delta::SetMatchDetail {
                id: sim.id.clone(),
                summary: Some(summary_of(sim, competition, phase)),
                detail: detail_of(sim),
            });
        }
        ProviderCommand::FetchStandings => {
            let _ = tx.send(Delta::SetStandings {
                competition: competition.to_string(),
                rows: seed_standings(competition),
            });
        }
        ProviderCommand::FetchScorers => {
            let _ = tx.send(Delta::SetScorers {
                competition: competition.to_string(),
                rows: seed_scorers(competition),
            });
        }
        ProviderCommand::FetchClub { club_id } => match seed_club(club_id) {
            Some(club) => {
                let _ = tx.send(Delta::SetClub(club));
            }
            None => {
                let _ = tx.send(Delta::Log(format!("[WARN] Unknown club {club_id}")));
            }
        },
        ProviderCommand::FetchPlayer { player_id } => {
            let _ = tx.send(Delta::SetPerson(seed_person(player_id, PersonKind::Player)));
        }
        ProviderCommand::FetchStaff { staff_id } => {
            let _ = tx.send(Delta::SetPerson(seed_person(staff_id, PersonKind::Staff)));
        }
        ProviderCommand::SetCompetition { .. } => {}
    }
}

fn maybe_score(sim: &mut SimMatch, now: DateTime<Utc>, rng: &mut impl Rng) {
    let phase = phase_at(sim.kickoff, sim.first_half_extra, sim.second_half_extra, now);
    if !phase.status.is_live() {
        return;
    }
    let minute = phase.minute.unwrap_or(0);
    for home_side in [true, false] {
        if !rng.gen_bool(GOAL_CHANCE_PER_SEC) {
            continue;
        }
        let team_idx = if home_side { sim.home } else { sim.away };
        if home_side {
            sim.score_home = sim.score_home.saturating_add(1);
        } else {
            sim.score_away = sim.score_away.saturating_add(1);
        }
        let scorer = player_name(team_idx as u32 * 100 + rng.gen_range(1..12));
        sim.goals.push(Event {
            minute,
            extra_minute: None,
            kind: EventKind::Goal,
            team: CLUBS[team_idx].1.to_string(),
            description: format!("Goal {scorer}"),
        });
        // Goals are reported straight away.
        sim.last_report = None;
    }
}

fn summary_of(sim: &SimMatch, competition: &str, phase: SimPhase) -> MatchSummary {
    let started = !matches!(phase.status, MatchStatus::Scheduled);
    MatchSummary {
        id: sim.id.clone(),
        competition: competition.to_string(),
        matchday: Some(1),
        kickoff: sim.kickoff.format("%Y-%m-%dT%H:%M").to_string(),
        status: phase.status,
        minute: phase.minute,
        phase_start_ms: phase
            .phase_start
            .filter(|_| sim.publishes_phase)
            .map(|start| start.timestamp_millis()),
        phase_offset: phase.phase_offset.filter(|_| sim.publishes_phase),
        home: team_ref(sim.home),
        away: team_ref(sim.away),
        score_home: started.then_some(sim.score_home),
        score_away: started.then_some(sim.score_away),
    }
}

fn detail_of(sim: &SimMatch) -> MatchDetail {
    let possession = 40 + (sim.home * 7 + sim.away * 3) % 21;
    MatchDetail {
        venue: Some(format!("{} Stadium", CLUBS[sim.home].0)),
        referee: Some(player_name(900 + sim.home as u32)),
        events: sim.goals.clone(),
        lineups: None,
        stats: vec![
            StatRow {
                name: "Possession".to_string(),
                home: format!("{possession}%"),
                away: format!("{}%", 100 - possession),
            },
            StatRow {
                name: "Goals".to_string(),
                home: sim.score_home.to_string(),
                away: sim.score_away.to_string(),
            },
        ],
    }
}

fn seed_matches(competition: &str, now: DateTime<Utc>, rng: &mut impl Rng) -> Vec<SimMatch> {
    // Kickoffs relative to now, in minutes: finished, second half, break,
    // first half, about to start, tomorrow.
    const KICKOFFS: [i64; 6] = [-130, -72, -52, -20, 3, 26 * 60];
    KICKOFFS
        .iter()
        .enumerate()
        .map(|(idx, offset)| {
            let kickoff = now + ChronoDuration::minutes(*offset);
            let first_half_extra = rng.gen_range(1..4);
            let phase = phase_at(kickoff, first_half_extra, 4, now);
            let played = phase.minute.unwrap_or(0) as u8;
            SimMatch {
                id: format!("{}-{}", competition.to_lowercase(), idx + 1),
                home: (idx * 2) % CLUBS.len(),
                away: (idx * 2 + 1) % CLUBS.len(),
                kickoff,
                first_half_extra,
                second_half_extra: rng.gen_range(2..6),
                publishes_phase: idx % 2 == 0,
                score_home: if played > 0 { rng.gen_range(0..=played / 30) } else { 0 },
                score_away: if played > 0 { rng.gen_range(0..=played / 35) } else { 0 },
                goals: Vec::new(),
                last_status: None,
                last_report: None,
                report_every: Duration::from_secs(30),
            }
        })
        .collect()
}

fn team_ref(idx: usize) -> TeamRef {
    let (name, tla) = CLUBS[idx % CLUBS.len()];
    TeamRef {
        id: Some(club_id(idx)),
        name: name.to_string(),
        short_name: tla.to_string(),
    }
}

fn club_id(idx: usize) -> u32 {
    1000 + idx as u32
}

fn seed_standings(competition: &str) -> Vec<StandingRow> {
    let mut rng = StdRng::seed_from_u64(competition_seed(competition));
    let mut rows: Vec<StandingRow> = (0..CLUBS.len())
        .map(|idx| {
            let won = rng.gen_range(3..20);
            let draw = rng.gen_range(0..10);
            let played: u16 = 28;
            let lost = played.saturating_sub(won + draw);
            let goals_for = won * 2 + draw + rng.gen_range(0..8);
            let goals_against = lost * 2 + draw + rng.gen_range(0..8);
            StandingRow {
                position: 0,
                team: team_ref(idx),
                played,
                won,
                draw,
                lost,
                goals_for,
                goals_against,
                goal_difference: goals_for as i32 - goals_against as i32,
                points: won * 3 + draw,
                form: Some(
                    (0..5)
                        .map(|_| ["W", "D", "L"][rng.gen_range(0..3)])
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.goal_difference.cmp(&a.goal_difference))
            .then_with(|| b.goals_for.cmp(&a.goals_for))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = idx as u16 + 1;
    }
    rows
}

fn seed_scorers(competition: &str) -> Vec<ScorerRow> {
    let mut rng = StdRng::seed_from_u64(competition_seed(competition) ^ 0x5c0e);
    let mut rows: Vec<ScorerRow> = (0..10)
        .map(|idx| {
            let club = rng.gen_range(0..CLUBS.len());
            let player_id = club as u32 * 100 + 9 + idx % 3;
            ScorerRow {
                player_id: Some(player_id),
                player: player_name(player_id),
                team: team_ref(club),
                goals: rng.gen_range(4..22),
                assists: Some(rng.gen_range(0..10)),
                penalties: Some(rng.gen_range(0..4)),
                played: Some(rng.gen_range(20..29)),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.goals.cmp(&a.goals));
    rows
}

fn seed_club(club_id: u32) -> Option<ClubSheet> {
    let idx = club_id.checked_sub(1000)? as usize;
    let (name, tla) = CLUBS.get(idx)?;
    let squad = (1..=18)
        .map(|n| {
            let id = idx as u32 * 100 + n;
            SquadMember {
                id: Some(id),
                name: player_name(id),
                position: Some(POSITIONS[position_slot(n)].to_string()),
                nationality: Some("Freedonia".to_string()),
                date_of_birth: Some(format!("{}-0{}-1{}", 1990 + n % 12, 1 + n % 9, n % 10)),
                shirt_number: Some(n),
            }
        })
        .collect();
    let staff = vec![
        StaffMember {
            id: Some(idx as u32 * 100 + 90),
            name: player_name(idx as u32 * 100 + 90),
            role: "Head Coach".to_string(),
            nationality: Some("Freedonia".to_string()),
        },
        StaffMember {
            id: Some(idx as u32 * 100 + 91),
            name: player_name(idx as u32 * 100 + 91),
            role: "Assistant Coach".to_string(),
            nationality: None,
        },
    ];
    Some(ClubSheet {
        id: club_id,
        name: name.to_string(),
        short_name: tla.to_string(),
        tla: Some(tla.to_string()),
        founded: Some(1880 + idx as u16 * 7),
        venue: Some(format!("{name} Stadium")),
        colors: Some("Red / White".to_string()),
        website: None,
        address: None,
        squad,
        staff,
    })
}

fn seed_person(id: u32, kind: PersonKind) -> PersonSheet {
    let club = (id / 100) as usize % CLUBS.len();
    let number = id % 100;
    let (position, role, stats) = match kind {
        PersonKind::Player => (
            Some(POSITIONS[position_slot(number)].to_string()),
            None,
            vec![
                PersonStat {
                    label: "Appearances".to_string(),
                    value: (20 + number % 9).to_string(),
                },
                PersonStat {
                    label: "Goals".to_string(),
                    value: (number % 13).to_string(),
                },
            ],
        ),
        PersonKind::Staff => (None, Some("Head Coach".to_string()), Vec::new()),
    };
    PersonSheet {
        id,
        kind,
        name: player_name(id),
        first_name: None,
        last_name: None,
        date_of_birth: Some(format!("19{}-05-0{}", 80 + number % 19, 1 + number % 9)),
        nationality: Some("Freedonia".to_string()),
        position,
        role,
        shirt_number: (kind == PersonKind::Player).then_some(number),
        team: Some(team_ref(club)),
        stats,
    }
}

fn position_slot(number: u32) -> usize {
    match number {
        1 | 12 => 0,
        2..=5 | 13 | 14 => 1,
        6..=8 | 15 | 16 => 2,
        _ => 3,
    }
}

fn player_name(id: u32) -> String {
    let first = FIRST_NAMES[(id as usize * 7) % FIRST_NAMES.len()];
    let last = LAST_NAMES[(id as usize * 5 + id as usize / 100) % LAST_NAMES.len()];
    format!("{first} {last}")
}

fn competition_seed(competition: &str) -> u64 {
    competition
        .bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn seeded_status_mix(now: DateTime<Utc>) -> HashMap<MatchStatus, usize> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mix = HashMap::new();
        for sim in seed_matches("PL", now, &mut rng) {
            let phase = phase_at(sim.kickoff, sim.first_half_extra, sim.second_half_extra, now);
            *mix.entry(phase.status).or_insert(0) += 1;
        }
        mix
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    #[test]
    fn timeline_walks_through_halves() {
        let kickoff = at(0);
        assert_eq!(phase_at(kickoff, 2, 3, at(-60)).status, MatchStatus::Scheduled);

        let first = phase_at(kickoff, 2, 3, at(10 * 60 + 5));
        assert_eq!(first.status, MatchStatus::Live);
        assert_eq!(first.minute, Some(10));
        assert_eq!(first.phase_offset, Some(0));

        assert_eq!(phase_at(kickoff, 2, 3, at(50 * 60)).status, MatchStatus::Paused);

        let second = phase_at(kickoff, 2, 3, at(62 * 60 + 30));
        assert_eq!(second.status, MatchStatus::Live);
        assert_eq!(second.minute, Some(45));
        assert_eq!(second.phase_start, Some(at(62 * 60)));
        assert_eq!(second.phase_offset, Some(45));

        let done = phase_at(kickoff, 2, 3, at(200 * 60));
        assert_eq!(done.status, MatchStatus::Finished);
        assert_eq!(done.minute, Some(93));
    }

    #[test]
    fn seeded_matchday_covers_every_state() {
        let mix = seeded_status_mix(at(1_000_000));
        for status in [
            MatchStatus::Scheduled,
            MatchStatus::Live,
            MatchStatus::Paused,
            MatchStatus::Finished,
        ] {
            assert!(mix.get(&status).copied().unwrap_or(0) > 0, "{status:?} missing");
        }
    }

    #[test]
    fn seeded_clubs_resolve() {
        let club = seed_club(1003).expect("club");
        assert_eq!(club.tla.as_deref(), Some("KSA"));
        assert_eq!(club.squad.len(), 18);
        assert!(seed_club(42).is_none());
    }
}
