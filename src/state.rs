use std::collections::{HashMap, HashSet, VecDeque};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::live_clock::{ClockBoard, ClockDisplay, ClockSnapshot, MatchStatus};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Matches,
    Match { match_id: String },
    Standings,
    Scorers,
    Club { club_id: u32 },
    Person { person_id: u32, kind: PersonKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonKind {
    Player,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Kickoff,
    LiveFirst,
    Recent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: Option<u32>,
    pub name: String,
    pub short_name: String,
}

impl TeamRef {
    pub fn label(&self) -> &str {
        if self.short_name.is_empty() {
            &self.name
        } else {
            &self.short_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: String,
    pub competition: String,
    pub matchday: Option<u16>,
    /// UTC kickoff, `YYYY-MM-DDTHH:MM`.
    pub kickoff: String,
    pub status: MatchStatus,
    pub minute: Option<u16>,
    pub phase_start_ms: Option<i64>,
    pub phase_offset: Option<u16>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub score_home: Option<u8>,
    pub score_away: Option<u8>,
}

impl MatchSummary {
    pub fn clock_snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            status: self.status,
            minute: self.minute,
            phase_start: self.phase_start_ms.and_then(DateTime::from_timestamp_millis),
            phase_offset: self.phase_offset,
        }
    }

    pub fn score_label(&self) -> String {
        match (self.score_home, self.score_away) {
            (Some(home), Some(away)) => format!("{home}-{away}"),
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub events: Vec<Event>,
    pub lineups: Option<MatchLineups>,
    pub stats: Vec<StatRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    Card,
    Sub,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub minute: u16,
    pub extra_minute: Option<u16>,
    pub kind: EventKind,
    pub team: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub id: Option<u32>,
    pub name: String,
    pub number: Option<u32>,
    pub pos: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupSide {
    pub team: String,
    pub formation: String,
    pub starting: Vec<PlayerSlot>,
    pub subs: Vec<PlayerSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLineups {
    pub sides: Vec<LineupSide>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRow {
    pub name: String,
    pub home: String,
    pub away: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub position: u16,
    pub team: TeamRef,
    pub played: u16,
    pub won: u16,
    pub draw: u16,
    pub lost: u16,
    pub goals_for: u16,
    pub goals_against: u16,
    pub goal_difference: i32,
    pub points: u16,
    pub form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerRow {
    pub player_id: Option<u32>,
    pub player: String,
    pub team: TeamRef,
    pub goals: u16,
    pub assists: Option<u16>,
    pub penalties: Option<u16>,
    pub played: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadMember {
    pub id: Option<u32>,
    pub name: String,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<String>,
    pub shirt_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffMember {
    pub id: Option<u32>,
    pub name: String,
    pub role: String,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubSheet {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub tla: Option<String>,
    pub founded: Option<u16>,
    pub venue: Option<String>,
    pub colors: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub squad: Vec<SquadMember>,
    pub staff: Vec<StaffMember>,
}

impl ClubSheet {
    /// Rows the club sheet lets you open: squad first, then staff.
    pub fn people(&self) -> Vec<(PersonKind, Option<u32>, &str)> {
        self.squad
            .iter()
            .map(|p| (PersonKind::Player, p.id, p.name.as_str()))
            .chain(
                self.staff
                    .iter()
                    .map(|s| (PersonKind::Staff, s.id, s.name.as_str())),
            )
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonStat {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSheet {
    pub id: u32,
    pub kind: PersonKind,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub position: Option<String>,
    pub role: Option<String>,
    pub shirt_number: Option<u32>,
    pub team: Option<TeamRef>,
    pub stats: Vec<PersonStat>,
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub history: Vec<Screen>,
    pub competitions: Vec<String>,
    pub competition_idx: usize,
    pub sort: SortMode,
    pub matches: Vec<MatchSummary>,
    pub matches_selected: usize,
    pub matches_fetched_at: Option<SystemTime>,
    pub matches_stale: bool,
    pub match_detail: HashMap<String, MatchDetail>,
    pub standings: Vec<StandingRow>,
    pub standings_selected: usize,
    pub standings_fetched_at: Option<SystemTime>,
    pub scorers: Vec<ScorerRow>,
    pub scorers_selected: usize,
    pub scorers_fetched_at: Option<SystemTime>,
    pub clubs: HashMap<u32, ClubSheet>,
    pub players: HashMap<u32, PersonSheet>,
    pub staff: HashMap<u32, PersonSheet>,
    pub sheet_selected: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub clocks: ClockBoard,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_clocks(&AppConfig::default(), ClockBoard::in_memory())
    }

    pub fn with_clocks(config: &AppConfig, clocks: ClockBoard) -> Self {
        Self {
            screen: Screen::Matches,
            history: Vec::new(),
            competitions: config.competitions.clone(),
            competition_idx: 0,
            sort: SortMode::LiveFirst,
            matches: Vec::new(),
            matches_selected: 0,
            matches_fetched_at: None,
            matches_stale: false,
            match_detail: HashMap::new(),
            standings: Vec::new(),
            standings_selected: 0,
            standings_fetched_at: None,
            scorers: Vec::new(),
            scorers_selected: 0,
            scorers_fetched_at: None,
            clubs: HashMap::new(),
            players: HashMap::new(),
            staff: HashMap::new(),
            sheet_selected: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            clocks,
        }
    }

    pub fn competition(&self) -> &str {
        self.competitions
            .get(self.competition_idx)
            .map(String::as_str)
            .unwrap_or("PL")
    }

    /// Switches to the next configured competition and drops data of the old one.
    pub fn cycle_competition(&mut self) {
        if self.competitions.len() <= 1 {
            return;
        }
        self.competition_idx = (self.competition_idx + 1) % self.competitions.len();
        self.matches.clear();
        self.matches_selected = 0;
        self.matches_fetched_at = None;
        self.matches_stale = false;
        self.standings.clear();
        self.standings_selected = 0;
        self.standings_fetched_at = None;
        self.scorers.clear();
        self.scorers_selected = 0;
        self.scorers_fetched_at = None;
        self.clocks.clear();
        self.history.clear();
        self.screen = Screen::Matches;
        self.push_log(format!("[INFO] Competition: {}", self.competition()));
    }

    pub fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            SortMode::Kickoff => SortMode::LiveFirst,
            SortMode::LiveFirst => SortMode::Recent,
            SortMode::Recent => SortMode::Kickoff,
        };
        self.sort_matches();
    }

    pub fn sort_matches(&mut self) {
        self.sort_matches_with_selected_id(None);
    }

    pub fn sort_matches_with_selected_id(&mut self, selected_id: Option<String>) {
        let selected_id = selected_id.or_else(|| self.selected_match_id());
        match self.sort {
            SortMode::Kickoff => self
                .matches
                .sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then_with(|| a.id.cmp(&b.id))),
            SortMode::Recent => self
                .matches
                .sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then_with(|| a.id.cmp(&b.id))),
            SortMode::LiveFirst => self.matches.sort_by(|a, b| {
                let rank = |m: &MatchSummary| match m.status {
                    s if s.in_progress() => 0,
                    MatchStatus::Scheduled => 1,
                    _ => 2,
                };
                rank(a)
                    .cmp(&rank(b))
                    .then_with(|| a.kickoff.cmp(&b.kickoff))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        if let Some(id) = selected_id
            && let Some(pos) = self.matches.iter().position(|m| m.id == id)
        {
            self.matches_selected = pos;
            return;
        }
        self.clamp_selection();
    }

    pub fn selected_match_id(&self) -> Option<String> {
        match &self.screen {
            Screen::Match { match_id } => Some(match_id.clone()),
            _ => self.matches.get(self.matches_selected).map(|m| m.id.clone()),
        }
    }

    pub fn selected_match(&self) -> Option<&MatchSummary> {
        let id = self.selected_match_id()?;
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn clock_display(&self, match_id: &str) -> ClockDisplay {
        self.clocks.display(match_id)
    }

    pub fn select_next(&mut self) {
        let total = self.list_len();
        if total == 0 {
            return;
        }
        let selected = self.selection_mut();
        *selected = (*selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.list_len();
        if total == 0 {
            return;
        }
        let selected = self.selection_mut();
        *selected = if *selected == 0 { total - 1 } else { *selected - 1 };
    }

    pub fn clamp_selection(&mut self) {
        let total = self.list_len();
        let selected = self.selection_mut();
        if total == 0 {
            *selected = 0;
        } else if *selected >= total {
            *selected = total - 1;
        }
    }

    fn list_len(&self) -> usize {
        match &self.screen {
            Screen::Matches | Screen::Match { .. } => self.matches.len(),
            Screen::Standings => self.standings.len(),
            Screen::Scorers => self.scorers.len(),
            Screen::Club { club_id } => self
                .clubs
                .get(club_id)
                .map(|club| club.squad.len() + club.staff.len())
                .unwrap_or(0),
            Screen::Person { .. } => 0,
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        match &self.screen {
            Screen::Matches | Screen::Match { .. } => &mut self.matches_selected,
            Screen::Standings => &mut self.standings_selected,
            Screen::Scorers => &mut self.scorers_selected,
            Screen::Club { .. } | Screen::Person { .. } => &mut self.sheet_selected,
        }
    }

    /// Jumps to a top-level tab; sheet history is dropped.
    pub fn show_tab(&mut self, screen: Screen) {
        self.history.clear();
        self.screen = screen;
    }

    pub fn open(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        let previous = std::mem::replace(&mut self.screen, screen);
        self.history.push(previous);
        if matches!(self.screen, Screen::Club { .. }) {
            self.sheet_selected = 0;
        }
    }

    pub fn back(&mut self) {
        self.screen = self.history.pop().unwrap_or(Screen::Matches);
    }

    /// Screen the selected row of the current list leads to.
    pub fn selected_target(&self) -> Option<Screen> {
        match &self.screen {
            Screen::Matches => self.matches.get(self.matches_selected).map(|m| Screen::Match {
                match_id: m.id.clone(),
            }),
            Screen::Standings => self
                .standings
                .get(self.standings_selected)
                .and_then(|row| row.team.id)
                .map(|club_id| Screen::Club { club_id }),
            Screen::Scorers => self
                .scorers
                .get(self.scorers_selected)
                .and_then(|row| row.player_id)
                .map(|person_id| Screen::Person {
                    person_id,
                    kind: PersonKind::Player,
                }),
            Screen::Club { club_id } => {
                let club = self.clubs.get(club_id)?;
                let people = club.people();
                let (kind, id, _) = people.get(self.sheet_selected)?;
                id.map(|person_id| Screen::Person {
                    person_id,
                    kind: *kind,
                })
            }
            Screen::Match { .. } | Screen::Person { .. } => None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Advances running clocks; returns true when a visible minute changed.
    pub fn tick_clocks(&mut self, now: DateTime<Utc>) -> bool {
        self.clocks.tick_all(now)
    }

    pub fn live_match_ids(&self) -> Vec<String> {
        self.matches
            .iter()
            .filter(|m| m.status.in_progress())
            .map(|m| m.id.clone())
            .collect()
    }

    /// Offline rows update the list only; clocks follow fresh observations.
    fn upsert_match(&mut self, summary: MatchSummary, now: DateTime<Utc>, stale: bool) {
        if !stale {
            self.clocks
                .sync(&summary.id, &summary.clock_snapshot(), now);
        }
        match self.matches.iter_mut().find(|m| m.id == summary.id) {
            Some(existing) => {
                let previous = std::mem::replace(existing, summary);
                let current = existing.clone();
                self.log_transition(&previous, &current);
            }
            None => self.matches.push(summary),
        }
    }

    fn log_transition(&mut self, previous: &MatchSummary, current: &MatchSummary) {
        let fixture = format!("{} v {}", current.home.label(), current.away.label());
        if previous.status != current.status {
            let msg = match current.status {
                MatchStatus::Live if previous.status == MatchStatus::Paused => {
                    Some(format!("[INFO] Second half: {fixture}"))
                }
                MatchStatus::Live => Some(format!("[INFO] Kick-off: {fixture}")),
                MatchStatus::Paused => Some(format!(
                    "[INFO] Half-time: {fixture} {}",
                    current.score_label()
                )),
                MatchStatus::Finished => Some(format!(
                    "[INFO] Full-time: {fixture} {}",
                    current.score_label()
                )),
                MatchStatus::Postponed | MatchStatus::Suspended | MatchStatus::Cancelled => Some(
                    format!("[WARN] {fixture}: {}", current.status.label().to_lowercase()),
                ),
                MatchStatus::Scheduled | MatchStatus::Unknown => None,
            };
            if let Some(msg) = msg {
                self.push_log(msg);
            }
        }

        let prev_home = previous.score_home.unwrap_or(0);
        let prev_away = previous.score_away.unwrap_or(0);
        let home = current.score_home.unwrap_or(0);
        let away = current.score_away.unwrap_or(0);
        if home > prev_home || away > prev_away {
            let scorer = if home > prev_home {
                current.home.label()
            } else {
                current.away.label()
            };
            let minute = self
                .clocks
                .display(&current.id)
                .minute()
                .or(current.minute)
                .map(|m| format!(" {m}'"))
                .unwrap_or_default();
            let msg = format!(
                "[ALERT] Goal{minute}: {scorer} ({} {home}-{away} {})",
                current.home.label(),
                current.away.label()
            );
            self.push_log(msg);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetMatches {
        competition: String,
        matches: Vec<MatchSummary>,
        stale: bool,
    },
    UpsertMatch(MatchSummary),
    SetMatchDetail {
        id: String,
        summary: Option<MatchSummary>,
        detail: MatchDetail,
    },
    SetStandings {
        competition: String,
        rows: Vec<StandingRow>,
    },
    SetScorers {
        competition: String,
        rows: Vec<ScorerRow>,
    },
    SetClub(ClubSheet),
    SetPerson(PersonSheet),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    RefreshMatches,
    FetchMatchDetail { match_id: String },
    FetchStandings,
    FetchScorers,
    FetchClub { club_id: u32 },
    FetchPlayer { player_id: u32 },
    FetchStaff { staff_id: u32 },
    SetCompetition { code: String },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    apply_delta_at(state, delta, Utc::now());
}

pub fn apply_delta_at(state: &mut AppState, delta: Delta, now: DateTime<Utc>) {
    match delta {
        Delta::SetMatches {
            competition,
            matches,
            stale,
        } => {
            if competition != state.competition() {
                return;
            }
            let selected_id = state.selected_match_id();
            let incoming: HashSet<String> = matches.iter().map(|m| m.id.clone()).collect();
            state.matches.retain(|m| incoming.contains(&m.id));
            for summary in matches {
                state.upsert_match(summary, now, stale);
            }
            {
                let keep: HashSet<&str> = state.matches.iter().map(|m| m.id.as_str()).collect();
                state.clocks.retain_ids(&keep);
            }
            state.matches_fetched_at = Some(SystemTime::now());
            if stale && !state.matches_stale {
                state.push_log("[INFO] Offline: showing cached matches");
            }
            state.matches_stale = stale;
            state.sort_matches_with_selected_id(selected_id);
        }
        Delta::UpsertMatch(summary) => {
            if summary.competition != state.competition() {
                return;
            }
            let selected_id = state.selected_match_id();
            state.upsert_match(summary, now, false);
            state.sort_matches_with_selected_id(selected_id);
        }
        Delta::SetMatchDetail { id, summary, detail } => {
            if let Some(summary) = summary
                && summary.competition == state.competition()
            {
                let selected_id = state.selected_match_id();
                state.upsert_match(summary, now, false);
                state.sort_matches_with_selected_id(selected_id);
            }
            state.match_detail.insert(id, detail);
        }
        Delta::SetStandings { competition, rows } => {
            if competition != state.competition() {
                return;
            }
            state.standings = rows;
            state.standings_fetched_at = Some(SystemTime::now());
            if state.standings_selected >= state.standings.len() {
                state.standings_selected = 0;
            }
        }
        Delta::SetScorers { competition, rows } => {
            if competition != state.competition() {
                return;
            }
            state.scorers = rows;
            state.scorers_fetched_at = Some(SystemTime::now());
            if state.scorers_selected >= state.scorers.len() {
                state.scorers_selected = 0;
            }
        }
        Delta::SetClub(club) => {
            state.clubs.insert(club.id, club);
        }
        Delta::SetPerson(person) => match person.kind {
            PersonKind::Player => {
                state.players.insert(person.id, person);
            }
            PersonKind::Staff => {
                state.staff.insert(person.id, person);
            }
        },
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn sort_label(sort: SortMode) -> &'static str {
    match sort {
        SortMode::Kickoff => "KICKOFF",
        SortMode::LiveFirst => "LIVE",
        SortMode::Recent => "RECENT",
    }
}

pub fn screen_label(screen: &Screen) -> &'static str {
    match screen {
        Screen::Matches => "MATCHES",
        Screen::Match { .. } => "MATCH",
        Screen::Standings => "STANDINGS",
        Screen::Scorers => "SCORERS",
        Screen::Club { .. } => "CLUB",
        Screen::Person {
            kind: PersonKind::Player,
            ..
        } => "PLAYER",
        Screen::Person {
            kind: PersonKind::Staff,
            ..
        } => "STAFF",
    }
}
