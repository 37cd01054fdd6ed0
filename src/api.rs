use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::live_clock::MatchStatus;
use crate::pagination::{fetch_all_pages, page_url, parse_page};
use crate::state::{
    ClubSheet, Event, EventKind, LineupSide, MatchDetail, MatchLineups, MatchSummary, PersonKind,
    PersonSheet, PersonStat, PlayerSlot, ScorerRow, SquadMember, StaffMember, StandingRow,
    StatRow, TeamRef,
};

/// A fetched value plus whether any part of it came from the offline cache.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    headers: Vec<(String, String)>,
    page_size: usize,
    max_pages: usize,
    timeout: Duration,
}

impl ApiClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            headers: config.auth_headers(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            timeout: config.request_timeout,
        }
    }

    pub fn matches_url(&self, competition: &str) -> String {
        page_url(
            &format!("{}/matches?competition={competition}", self.base_url),
            1,
            self.page_size,
        )
    }

    pub fn fetch_matches(&self, competition: &str) -> Result<Fetched<Vec<MatchSummary>>> {
        let mut stale = false;
        let rows: Vec<MatchDto> =
            fetch_all_pages(&self.matches_url(competition), self.max_pages, |url| {
                let body = self.get(url)?;
                stale |= body.stale;
                Ok(body.value)
            })?;
        let value = rows
            .into_iter()
            .filter_map(|dto| dto.into_summary(competition))
            .collect();
        Ok(Fetched { value, stale })
    }

    pub fn fetch_match_detail(&self, match_id: &str) -> Result<Fetched<ParsedMatchDetail>> {
        let body = self.get(&format!("{}/matches/{match_id}", self.base_url))?;
        Ok(Fetched {
            value: parse_match_detail_json(&body.value)?,
            stale: body.stale,
        })
    }

    pub fn fetch_standings(&self, competition: &str) -> Result<Fetched<Vec<StandingRow>>> {
        let body = self.get(&format!(
            "{}/standings?competition={competition}",
            self.base_url
        ))?;
        Ok(Fetched {
            value: parse_standings_json(&body.value)?,
            stale: body.stale,
        })
    }

    pub fn fetch_scorers(&self, competition: &str) -> Result<Fetched<Vec<ScorerRow>>> {
        let mut stale = false;
        let first = page_url(
            &format!("{}/scorers?competition={competition}", self.base_url),
            1,
            self.page_size,
        );
        let rows: Vec<ScorerDto> = fetch_all_pages(&first, self.max_pages, |url| {
            let body = self.get(url)?;
            stale |= body.stale;
            Ok(body.value)
        })?;
        let mut value: Vec<ScorerRow> = rows.into_iter().map(ScorerDto::into_row).collect();
        sort_scorers(&mut value);
        Ok(Fetched { value, stale })
    }

    pub fn fetch_club(&self, club_id: u32) -> Result<Fetched<ClubSheet>> {
        let body = self.get(&format!("{}/clubs/{club_id}", self.base_url))?;
        Ok(Fetched {
            value: parse_club_json(&body.value)?,
            stale: body.stale,
        })
    }

    pub fn fetch_player(&self, player_id: u32) -> Result<Fetched<PersonSheet>> {
        let body = self.get(&format!("{}/players/{player_id}", self.base_url))?;
        Ok(Fetched {
            value: parse_person_json(&body.value, PersonKind::Player)?,
            stale: body.stale,
        })
    }

    pub fn fetch_staff(&self, staff_id: u32) -> Result<Fetched<PersonSheet>> {
        let body = self.get(&format!("{}/staff/{staff_id}", self.base_url))?;
        Ok(Fetched {
            value: parse_person_json(&body.value, PersonKind::Staff)?,
            stale: body.stale,
        })
    }

    fn get(&self, url: &str) -> Result<Fetched<String>> {
        let client = http_client(self.timeout)?;
        let body = fetch_json_cached(client, url, &self.headers).context("request failed")?;
        Ok(Fetched {
            value: body.body,
            stale: body.stale,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParsedMatchDetail {
    pub summary: Option<MatchSummary>,
    pub detail: MatchDetail,
}

#[derive(Debug, Deserialize)]
struct TeamDto {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "shortName")]
    short_name: Option<String>,
    #[serde(default)]
    tla: Option<String>,
}

impl TeamDto {
    fn into_team(self) -> TeamRef {
        let name = self.name.unwrap_or_default().trim().to_string();
        let short_name = self
            .tla
            .filter(|tla| !tla.trim().is_empty())
            .or(self.short_name)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| abbreviate_team(&name));
        TeamRef {
            id: self.id,
            name,
            short_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MatchDto {
    id: Value,
    #[serde(default)]
    competition: Option<Value>,
    #[serde(default)]
    matchday: Option<u16>,
    #[serde(default, alias = "utcDate", alias = "kickoff")]
    utc_date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    minute: Option<Value>,
    #[serde(default, alias = "phaseStart")]
    phase_start: Option<Value>,
    #[serde(default, alias = "phaseOffset")]
    phase_offset: Option<u16>,
    #[serde(alias = "homeTeam")]
    home_team: TeamDto,
    #[serde(alias = "awayTeam")]
    away_team: TeamDto,
    #[serde(default)]
    score: Option<Value>,
}

impl MatchDto {
    /// Rows tagged with another competition are dropped.
    fn into_summary(self, competition: &str) -> Option<MatchSummary> {
        let id = value_to_id(&self.id)?;
        let row_competition = self.competition.as_ref().and_then(competition_code);
        if let Some(code) = row_competition.as_deref()
            && !competition.is_empty()
            && !code.eq_ignore_ascii_case(competition)
        {
            return None;
        }
        let (score_home, score_away) = self.score.as_ref().map(parse_score).unwrap_or_default();
        Some(MatchSummary {
            id,
            competition: row_competition.unwrap_or_else(|| competition.to_uppercase()),
            matchday: self.matchday,
            kickoff: self
                .utc_date
                .as_deref()
                .and_then(normalize_utc_time)
                .unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .map(MatchStatus::parse)
                .unwrap_or(MatchStatus::Unknown),
            minute: self.minute.as_ref().and_then(parse_minute),
            phase_start_ms: self.phase_start.as_ref().and_then(parse_timestamp_ms),
            phase_offset: self.phase_offset,
            home: self.home_team.into_team(),
            away: self.away_team.into_team(),
            score_home,
            score_away,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScorerDto {
    player: Value,
    #[serde(default)]
    team: Option<TeamDto>,
    #[serde(default, alias = "numberOfGoals")]
    goals: Option<u16>,
    #[serde(default)]
    assists: Option<u16>,
    #[serde(default)]
    penalties: Option<u16>,
    #[serde(default, alias = "playedMatches")]
    played_matches: Option<u16>,
}

impl ScorerDto {
    fn into_row(self) -> ScorerRow {
        let player = as_string(&self.player).unwrap_or_default();
        let player_id = self
            .player
            .get("id")
            .and_then(|v| v.as_u64())
            .map(|id| id as u32);
        ScorerRow {
            player_id,
            player,
            team: self.team.map(TeamDto::into_team).unwrap_or_default(),
            goals: self.goals.unwrap_or(0),
            assists: self.assists,
            penalties: self.penalties,
            played: self.played_matches,
        }
    }
}

pub fn parse_matches_json(raw: &str, competition: &str) -> Result<Vec<MatchSummary>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<MatchDto> = if trimmed.starts_with('{') {
        let root: Value = serde_json::from_str(trimmed).context("invalid matches json")?;
        match root.get("matches") {
            Some(list) => serde_json::from_value(list.clone()).context("invalid matches list")?,
            None => parse_page::<MatchDto>(trimmed)?.results,
        }
    } else {
        parse_page::<MatchDto>(trimmed)?.results
    };
    Ok(rows
        .into_iter()
        .filter_map(|dto| dto.into_summary(competition))
        .collect())
}

pub fn parse_match_detail_json(raw: &str) -> Result<ParsedMatchDetail> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ParsedMatchDetail {
            summary: None,
            detail: MatchDetail::default(),
        });
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid match detail json")?;
    let root = root.get("match").unwrap_or(&root);

    let summary = serde_json::from_value::<MatchDto>(root.clone())
        .ok()
        .and_then(|dto| dto.into_summary(""));
    let home = summary
        .as_ref()
        .map(|s| s.home.label().to_string())
        .unwrap_or_default();
    let away = summary
        .as_ref()
        .map(|s| s.away.label().to_string())
        .unwrap_or_default();

    let mut events = parse_events(root.get("events"), &home, &away);
    events.extend(parse_goals(root.get("goals"), &home, &away));
    events.extend(parse_bookings(root.get("bookings"), &home, &away));
    events.extend(parse_substitutions(root.get("substitutions"), &home, &away));
    events.sort_by_key(|event| (event.minute, event.extra_minute.unwrap_or(0)));

    let referee = pick_string(root, &["referee"]).or_else(|| {
        root.get("referees")
            .and_then(|v| v.as_array())
            .and_then(|list| list.first())
            .and_then(as_string)
    });

    Ok(ParsedMatchDetail {
        summary,
        detail: MatchDetail {
            venue: pick_string(root, &["venue", "stadium"]),
            referee,
            events,
            lineups: parse_lineups(root.get("lineups").or_else(|| root.get("lineup"))),
            stats: parse_stats(root.get("stats").or_else(|| root.get("statistics"))),
        },
    })
}

pub fn parse_standings_json(raw: &str) -> Result<Vec<StandingRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid standings json")?;
    let table = find_table(&root).map(Vec::as_slice).unwrap_or_default();

    let mut rows: Vec<StandingRow> = table.iter().filter_map(parse_standing_row).collect();
    rows.sort_by_key(|row| row.position);
    Ok(rows)
}

// Accepts a bare table, `{"standings": [...rows]}`, `{"results": [...]}` or
// football-data style `{"standings": [{"type": "TOTAL", "table": [...]}]}`.
fn find_table(root: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = root.as_array() {
        return Some(list);
    }
    let list = root
        .get("standings")
        .or_else(|| root.get("results"))
        .or_else(|| root.get("table"))?
        .as_array()?;
    let grouped = list.iter().any(|entry| entry.get("table").is_some());
    if !grouped {
        return Some(list);
    }
    list.iter()
        .find(|group| {
            group
                .get("type")
                .and_then(|v| v.as_str())
                .is_none_or(|kind| kind.eq_ignore_ascii_case("TOTAL"))
        })
        .and_then(|group| group.get("table"))
        .and_then(|v| v.as_array())
}

fn parse_standing_row(value: &Value) -> Option<StandingRow> {
    let team: TeamDto = serde_json::from_value(value.get("team")?.clone()).ok()?;
    let goals_for = pick_u32(value, &["goals_for", "goalsFor"]).unwrap_or(0) as u16;
    let goals_against = pick_u32(value, &["goals_against", "goalsAgainst"]).unwrap_or(0) as u16;
    let goal_difference = pick_i64(value, &["goal_difference", "goalDifference"])
        .map(|gd| gd as i32)
        .unwrap_or(goals_for as i32 - goals_against as i32);
    Some(StandingRow {
        position: pick_u32(value, &["position", "rank"]).unwrap_or(0) as u16,
        team: team.into_team(),
        played: pick_u32(value, &["played", "playedGames", "played_games"]).unwrap_or(0) as u16,
        won: pick_u32(value, &["won", "wins"]).unwrap_or(0) as u16,
        draw: pick_u32(value, &["draw", "draws"]).unwrap_or(0) as u16,
        lost: pick_u32(value, &["lost", "losses"]).unwrap_or(0) as u16,
        goals_for,
        goals_against,
        goal_difference,
        points: pick_u32(value, &["points", "pts"]).unwrap_or(0) as u16,
        form: pick_string(value, &["form"]).filter(|form| !form.is_empty()),
    })
}

pub fn parse_scorers_json(raw: &str) -> Result<Vec<ScorerRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<ScorerDto> = if trimmed.starts_with('{') {
        let root: Value = serde_json::from_str(trimmed).context("invalid scorers json")?;
        match root.get("scorers") {
            Some(list) => serde_json::from_value(list.clone()).context("invalid scorers list")?,
            None => parse_page::<ScorerDto>(trimmed)?.results,
        }
    } else {
        parse_page::<ScorerDto>(trimmed)?.results
    };
    let mut out: Vec<ScorerRow> = rows.into_iter().map(ScorerDto::into_row).collect();
    sort_scorers(&mut out);
    Ok(out)
}

fn sort_scorers(rows: &mut [ScorerRow]) {
    rows.sort_by(|a, b| {
        b.goals
            .cmp(&a.goals)
            .then_with(|| b.assists.unwrap_or(0).cmp(&a.assists.unwrap_or(0)))
            .then_with(|| a.player.cmp(&b.player))
    });
}

pub fn parse_club_json(raw: &str) -> Result<ClubSheet> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid club json")?;
    let id = pick_u32(&root, &["id"]).context("club without id")?;
    let name = pick_string(&root, &["name"]).unwrap_or_default();
    let short_name = pick_string(&root, &["short_name", "shortName"])
        .unwrap_or_else(|| abbreviate_team(&name));

    let squad = root
        .get("squad")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let name = as_string(entry)?;
                    Some(SquadMember {
                        id: pick_u32(entry, &["id"]),
                        name,
                        position: pick_string(entry, &["position"]),
                        nationality: pick_string(entry, &["nationality"]),
                        date_of_birth: pick_string(entry, &["date_of_birth", "dateOfBirth"]),
                        shirt_number: pick_u32(entry, &["shirt_number", "shirtNumber", "number"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut staff: Vec<StaffMember> = root
        .get("staff")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let name = as_string(entry)?;
                    Some(StaffMember {
                        id: pick_u32(entry, &["id"]),
                        name,
                        role: pick_string(entry, &["role", "position"])
                            .unwrap_or_else(|| "Staff".to_string()),
                        nationality: pick_string(entry, &["nationality"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    if let Some(coach) = root.get("coach")
        && let Some(name) = as_string(coach)
        && !staff.iter().any(|s| s.name == name)
    {
        staff.insert(
            0,
            StaffMember {
                id: pick_u32(coach, &["id"]),
                name,
                role: "Head Coach".to_string(),
                nationality: pick_string(coach, &["nationality"]),
            },
        );
    }

    Ok(ClubSheet {
        id,
        name,
        short_name,
        tla: pick_string(&root, &["tla"]),
        founded: pick_u32(&root, &["founded"]).map(|year| year as u16),
        venue: pick_string(&root, &["venue", "stadium"]),
        colors: pick_string(&root, &["club_colors", "clubColors", "colors"]),
        website: pick_string(&root, &["website"]),
        address: pick_string(&root, &["address"]),
        squad,
        staff,
    })
}

pub fn parse_person_json(raw: &str, kind: PersonKind) -> Result<PersonSheet> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid person json")?;
    let id = pick_u32(&root, &["id"]).context("person without id")?;
    let first_name = pick_string(&root, &["first_name", "firstName"]);
    let last_name = pick_string(&root, &["last_name", "lastName"]);
    let name = pick_string(&root, &["name"])
        .or_else(|| match (&first_name, &last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        })
        .unwrap_or_default();
    let team = root
        .get("current_team")
        .or_else(|| root.get("currentTeam"))
        .or_else(|| root.get("team"))
        .and_then(|v| serde_json::from_value::<TeamDto>(v.clone()).ok())
        .map(TeamDto::into_team)
        .filter(|team| !team.name.is_empty());

    Ok(PersonSheet {
        id,
        kind,
        name,
        first_name,
        last_name,
        date_of_birth: pick_string(&root, &["date_of_birth", "dateOfBirth"]),
        nationality: pick_string(&root, &["nationality"]),
        position: pick_string(&root, &["position"]),
        role: pick_string(&root, &["role"]),
        shirt_number: pick_u32(&root, &["shirt_number", "shirtNumber"]),
        team,
        stats: parse_person_stats(root.get("stats").or_else(|| root.get("statistics"))),
    })
}

fn parse_person_stats(value: Option<&Value>) -> Vec<PersonStat> {
    let mut out = Vec::new();
    match value {
        Some(Value::Object(map)) => {
            for (key, val) in map {
                if val.is_null() || val.is_object() || val.is_array() {
                    continue;
                }
                out.push(PersonStat {
                    label: humanize_key(key),
                    value: value_to_string(Some(val)),
                });
            }
        }
        Some(Value::Array(list)) => {
            for entry in list {
                let Some(label) = pick_string(entry, &["label", "name", "title"]) else {
                    continue;
                };
                out.push(PersonStat {
                    label,
                    value: value_to_string(entry.get("value")),
                });
            }
        }
        _ => {}
    }
    out
}

fn humanize_key(key: &str) -> String {
    let mut out = String::new();
    for (idx, ch) in key.chars().enumerate() {
        if ch == '_' {
            out.push(' ');
        } else if ch.is_ascii_uppercase() && idx > 0 {
            out.push(' ');
            out.push(ch.to_ascii_lowercase());
        } else if idx == 0 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_events(value: Option<&Value>, home: &str, away: &str) -> Vec<Event> {
    let mut out = Vec::new();
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return out;
    };
    for entry in list {
        let event_type = pick_string(entry, &["type", "kind"]).unwrap_or_default();
        let kind = parse_event_kind(&event_type);
        let player = entry
            .get("player")
            .and_then(as_string)
            .unwrap_or_default();
        let detail = pick_string(entry, &["detail", "description"]).unwrap_or_default();
        let description = [event_type.as_str(), player.as_str(), detail.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        out.push(Event {
            minute: pick_u32(entry, &["minute", "time"]).unwrap_or(0) as u16,
            extra_minute: pick_u32(entry, &["extra_minute", "extraMinute", "injuryTime"])
                .map(|m| m as u16),
            kind,
            team: event_team(entry, home, away),
            description: if description.is_empty() {
                "Event".to_string()
            } else {
                description
            },
        });
    }
    out
}

fn parse_goals(value: Option<&Value>, home: &str, away: &str) -> Vec<Event> {
    collect_typed_events(value, EventKind::Goal, home, away, |entry| {
        let scorer = entry
            .get("scorer")
            .and_then(as_string)
            .unwrap_or_default();
        let goal_type = pick_string(entry, &["type"])
            .filter(|t| !t.eq_ignore_ascii_case("REGULAR"))
            .map(|t| format!(" ({})", t.to_lowercase().replace('_', " ")))
            .unwrap_or_default();
        format!("Goal {scorer}{goal_type}").trim().to_string()
    })
}

fn parse_bookings(value: Option<&Value>, home: &str, away: &str) -> Vec<Event> {
    collect_typed_events(value, EventKind::Card, home, away, |entry| {
        let card = pick_string(entry, &["card"])
            .map(|c| c.to_lowercase().replace('_', " "))
            .unwrap_or_else(|| "card".to_string());
        let player = entry
            .get("player")
            .and_then(as_string)
            .unwrap_or_default();
        format!("{card} {player}").trim().to_string()
    })
}

fn parse_substitutions(value: Option<&Value>, home: &str, away: &str) -> Vec<Event> {
    collect_typed_events(value, EventKind::Sub, home, away, |entry| {
        let off = entry
            .get("playerOut")
            .or_else(|| entry.get("player_out"))
            .and_then(as_string)
            .unwrap_or_default();
        let on = entry
            .get("playerIn")
            .or_else(|| entry.get("player_in"))
            .and_then(as_string)
            .unwrap_or_default();
        format!("Sub {on} for {off}")
    })
}

fn collect_typed_events(
    value: Option<&Value>,
    kind: EventKind,
    home: &str,
    away: &str,
    describe: impl Fn(&Value) -> String,
) -> Vec<Event> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    list.iter()
        .map(|entry| Event {
            minute: pick_u32(entry, &["minute"]).unwrap_or(0) as u16,
            extra_minute: pick_u32(entry, &["injuryTime", "extra_minute", "extraMinute"])
                .map(|m| m as u16),
            kind,
            team: event_team(entry, home, away),
            description: describe(entry),
        })
        .collect()
}

fn event_team(entry: &Value, home: &str, away: &str) -> String {
    if let Some(is_home) = entry.get("is_home").or_else(|| entry.get("isHome")) {
        return if is_home.as_bool().unwrap_or(true) {
            home.to_string()
        } else {
            away.to_string()
        };
    }
    entry
        .get("team")
        .and_then(|team| {
            pick_string(team, &["tla", "short_name", "shortName"]).or_else(|| as_string(team))
        })
        .unwrap_or_default()
}

fn parse_event_kind(event_type: &str) -> EventKind {
    let lowered = event_type.to_lowercase();
    if lowered.contains("goal") {
        EventKind::Goal
    } else if lowered.contains("card") || lowered.contains("booking") {
        EventKind::Card
    } else if lowered.contains("sub") {
        EventKind::Sub
    } else {
        EventKind::Other
    }
}

fn parse_lineups(value: Option<&Value>) -> Option<MatchLineups> {
    let lineup = value?;
    let mut sides = Vec::new();
    let pairs = [
        lineup.get("home").or_else(|| lineup.get("homeTeam")),
        lineup.get("away").or_else(|| lineup.get("awayTeam")),
    ];
    for side in pairs.into_iter().flatten() {
        if let Some(side) = parse_lineup_side(side) {
            sides.push(side);
        }
    }
    if let Some(list) = lineup.as_array() {
        sides.extend(list.iter().filter_map(parse_lineup_side));
    }
    if sides.is_empty() {
        None
    } else {
        Some(MatchLineups { sides })
    }
}

fn parse_lineup_side(value: &Value) -> Option<LineupSide> {
    let team = value
        .get("team")
        .and_then(as_string)
        .or_else(|| pick_string(value, &["name"]))
        .unwrap_or_default();
    let starting = parse_players(
        value
            .get("starting")
            .or_else(|| value.get("lineup"))
            .or_else(|| value.get("starters")),
    );
    let subs = parse_players(
        value
            .get("bench")
            .or_else(|| value.get("substitutes"))
            .or_else(|| value.get("subs")),
    );
    if team.is_empty() && starting.is_empty() {
        return None;
    }
    Some(LineupSide {
        team,
        formation: pick_string(value, &["formation"]).unwrap_or_default(),
        starting,
        subs,
    })
}

fn parse_players(value: Option<&Value>) -> Vec<PlayerSlot> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| {
            let name = as_string(entry)?;
            Some(PlayerSlot {
                id: pick_u32(entry, &["id"]),
                name,
                number: pick_u32(entry, &["shirt_number", "shirtNumber", "number"]),
                pos: pick_string(entry, &["position", "pos"]),
            })
        })
        .collect()
}

fn parse_stats(value: Option<&Value>) -> Vec<StatRow> {
    let mut rows = Vec::new();
    match value {
        Some(Value::Array(list)) => {
            for stat in list {
                let Some(name) = pick_string(stat, &["name", "title", "label"]) else {
                    continue;
                };
                rows.push(StatRow {
                    name,
                    home: value_to_string(stat.get("home").or_else(|| stat.get("homeValue"))),
                    away: value_to_string(stat.get("away").or_else(|| stat.get("awayValue"))),
                });
            }
        }
        // `{"home": {"corners": 3}, "away": {"corners": 5}}`
        Some(Value::Object(map)) => {
            let home = map.get("home").and_then(|v| v.as_object());
            let away = map.get("away").and_then(|v| v.as_object());
            if let Some(home) = home {
                let mut keys: Vec<&String> = home.keys().collect();
                keys.sort();
                for key in keys {
                    rows.push(StatRow {
                        name: humanize_key(key),
                        home: value_to_string(home.get(key)),
                        away: value_to_string(away.and_then(|a| a.get(key))),
                    });
                }
            }
        }
        _ => {}
    }
    rows
}

fn parse_score(value: &Value) -> (Option<u8>, Option<u8>) {
    let source = value
        .get("full_time")
        .or_else(|| value.get("fullTime"))
        .filter(|v| v.is_object())
        .unwrap_or(value);
    let home = source.get("home").and_then(|v| v.as_u64()).map(|v| v as u8);
    let away = source.get("away").and_then(|v| v.as_u64()).map(|v| v as u8);
    (home, away)
}

/// `67`, `"67"`, `"45+2"` (= 47) or `"90+4'"`.
pub fn parse_minute(value: &Value) -> Option<u16> {
    if let Some(num) = value.as_u64() {
        return u16::try_from(num).ok();
    }
    let raw = value.as_str()?.trim().trim_end_matches('\'');
    let mut total: u16 = 0;
    for part in raw.split('+') {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        total = total.saturating_add(part.parse::<u16>().ok()?);
    }
    Some(total)
}

/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or epoch millis.
pub fn parse_timestamp_ms(value: &Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return Some(ms);
    }
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    None
}

fn competition_code(value: &Value) -> Option<String> {
    let code = match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(_) => pick_string(value, &["code", "short_name", "shortName"]),
        _ => None,
    }?;
    if code.is_empty() {
        None
    } else {
        Some(code.to_uppercase())
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_utc_time(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('Z');
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = trimmed.replace(' ', "T");
    if cleaned.len() >= 16 {
        return Some(cleaned[..16].to_string());
    }
    Some(cleaned)
}

fn value_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => {
            if *b {
                "yes".to_string()
            } else {
                "no".to_string()
            }
        }
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn abbreviate_team(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.len() <= 3 {
        return trimmed.to_uppercase();
    }
    let words: Vec<&str> = trimmed
        .split_whitespace()
        .filter(|w| !matches!(w.to_uppercase().as_str(), "FC" | "AFC" | "CF" | "SC"))
        .collect();
    if words.len() == 1 {
        return words[0].chars().take(3).collect::<String>().to_uppercase();
    }
    let mut abbr = String::new();
    for part in &words {
        if let Some(ch) = part.chars().next() {
            abbr.push(ch);
        }
        if abbr.chars().count() >= 3 {
            break;
        }
    }
    if abbr.chars().count() >= 2 {
        return abbr.to_uppercase();
    }
    trimmed.chars().take(3).collect::<String>().to_uppercase()
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(*key)
            && let Some(name) = as_string(v)
            && !name.is_empty()
        {
            return Some(name);
        }
    }
    None
}

fn pick_u32(value: &Value, keys: &[&str]) -> Option<u32> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_u64() {
                return u32::try_from(num).ok();
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<u32>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn pick_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_i64() {
                return Some(num);
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<i64>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                return Some(name.trim().to_string());
            }
            if let Some(Value::String(name)) = map.get("shortName") {
                return Some(name.trim().to_string());
            }
            if let Some(player) = map.get("player") {
                return as_string(player);
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minute_accepts_stoppage_notation() {
        assert_eq!(parse_minute(&json!(67)), Some(67));
        assert_eq!(parse_minute(&json!("45+2")), Some(47));
        assert_eq!(parse_minute(&json!("90+4'")), Some(94));
        assert_eq!(parse_minute(&json!("HT")), None);
        assert_eq!(parse_minute(&json!("45+")), None);
    }

    #[test]
    fn timestamps_in_several_shapes() {
        let rfc = parse_timestamp_ms(&json!("2026-05-01T15:00:00Z"));
        let offset = parse_timestamp_ms(&json!("2026-05-01T17:00:00+02:00"));
        let naive = parse_timestamp_ms(&json!("2026-05-01T15:00:00"));
        assert!(rfc.is_some());
        assert_eq!(rfc, offset);
        assert_eq!(rfc, naive);
        assert_eq!(parse_timestamp_ms(&json!(1_000)), Some(1_000));
        assert_eq!(parse_timestamp_ms(&json!("soon")), None);
    }

    #[test]
    fn abbreviations() {
        assert_eq!(abbreviate_team("Arsenal FC"), "ARS");
        assert_eq!(abbreviate_team("Manchester United FC"), "MU");
        assert_eq!(abbreviate_team("Real Club Deportivo Mallorca"), "RCD");
        assert_eq!(abbreviate_team("psg"), "PSG");
    }

    #[test]
    fn humanized_stat_keys() {
        assert_eq!(humanize_key("yellowCards"), "Yellow cards");
        assert_eq!(humanize_key("goals_scored"), "Goals scored");
    }
}
