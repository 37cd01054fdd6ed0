//! Plain-text renderings of each screen. `main` wraps these in ratatui widgets.

use chrono::{Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::live_clock::{ClockDisplay, MatchStatus};
use crate::state::{
    AppState, ClubSheet, EventKind, LineupSide, MatchSummary, PersonKind, PersonSheet, PlayerSlot,
};

const KICKOFF_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Minute column for a match: the live clock when one runs, else a status tag.
pub fn clock_label(state: &AppState, m: &MatchSummary) -> String {
    match state.clock_display(&m.id) {
        ClockDisplay::Hidden => status_fallback(m),
        display => display.label(),
    }
}

fn status_fallback(m: &MatchSummary) -> String {
    match m.status {
        MatchStatus::Scheduled => kickoff_time_only(&m.kickoff),
        MatchStatus::Live => m
            .minute
            .map(|minute| format!("{minute}'"))
            .unwrap_or_else(|| "LIVE".to_string()),
        MatchStatus::Paused => "HT".to_string(),
        MatchStatus::Finished => "FT".to_string(),
        MatchStatus::Postponed => "PST".to_string(),
        MatchStatus::Suspended => "SUS".to_string(),
        MatchStatus::Cancelled => "CAN".to_string(),
        MatchStatus::Unknown => "-".to_string(),
    }
}

pub fn match_row(state: &AppState, m: &MatchSummary) -> String {
    let matchday = m
        .matchday
        .map(|md| format!("MD{md}"))
        .unwrap_or_default();
    format!(
        "{:>6}  {:>4} {:^5} {:<4}  {:<5} {}",
        clock_label(state, m),
        m.home.label(),
        m.score_label(),
        m.away.label(),
        matchday,
        format_kickoff(&m.kickoff)
    )
}

pub fn matches_lines(state: &AppState) -> Vec<String> {
    state.matches.iter().map(|m| match_row(state, m)).collect()
}

pub fn match_detail_text(state: &AppState, match_id: &str) -> String {
    let Some(m) = state.matches.iter().find(|m| m.id == match_id) else {
        return "Match not loaded yet".to_string();
    };
    let mut lines = vec![
        format!(
            "{}  {}  {}",
            m.home.name,
            m.score_label(),
            m.away.name
        ),
        format!(
            "Clock: {}   Status: {}",
            match state.clock_display(&m.id) {
                ClockDisplay::Final(minute) => format!("FT ({minute}')"),
                ClockDisplay::Hidden => status_fallback(m),
                display => display.label(),
            },
            m.status.label()
        ),
        format!("Kickoff: {}", format_kickoff(&m.kickoff)),
    ];

    let Some(detail) = state.match_detail.get(match_id) else {
        lines.push(String::new());
        lines.push("No details yet".to_string());
        return lines.join("\n");
    };
    if let Some(venue) = &detail.venue {
        lines.push(format!("Venue: {venue}"));
    }
    if let Some(referee) = &detail.referee {
        lines.push(format!("Referee: {referee}"));
    }

    lines.push(String::new());
    lines.push("Events:".to_string());
    if detail.events.is_empty() {
        lines.push("  none".to_string());
    }
    for event in &detail.events {
        let minute = match event.extra_minute {
            Some(extra) if extra > 0 => format!("{}+{extra}'", event.minute),
            _ => format!("{}'", event.minute),
        };
        lines.push(format!(
            "  {minute:>6} {:<4} {:<4} {}",
            event_kind_label(event.kind),
            event.team,
            event.description
        ));
    }

    if !detail.stats.is_empty() {
        lines.push(String::new());
        lines.push("Stats:".to_string());
        for row in &detail.stats {
            lines.push(format!("  {:>6}  {:<18} {:<6}", row.home, row.name, row.away));
        }
    }

    if let Some(lineups) = &detail.lineups {
        for side in &lineups.sides {
            lines.push(String::new());
            lines.extend(lineup_lines(side));
        }
    }
    lines.join("\n")
}

fn lineup_lines(side: &LineupSide) -> Vec<String> {
    let mut lines = Vec::new();
    if side.formation.is_empty() {
        lines.push(side.team.clone());
    } else {
        lines.push(format!("{} ({})", side.team, side.formation));
    }
    for player in &side.starting {
        lines.push(format!("  {}", format_player(player)));
    }
    if !side.subs.is_empty() {
        lines.push("  Subs:".to_string());
        for player in &side.subs {
            lines.push(format!("  {}", format_player(player)));
        }
    }
    lines
}

fn format_player(player: &PlayerSlot) -> String {
    let num = player
        .number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "--".to_string());
    match player.pos.as_deref() {
        Some(pos) if !pos.is_empty() => format!("{num:>2} {} {pos}", player.name),
        _ => format!("{num:>2} {}", player.name),
    }
}

pub fn standings_header() -> String {
    format!(
        "{:>3} {:<22} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}  {}",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts", "Form"
    )
}

pub fn standings_lines(state: &AppState) -> Vec<String> {
    state
        .standings
        .iter()
        .map(|row| {
            format!(
                "{:>3} {:<22} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+4} {:>4}  {}",
                row.position,
                truncate_chars(&row.team.name, 22),
                row.played,
                row.won,
                row.draw,
                row.lost,
                row.goals_for,
                row.goals_against,
                row.goal_difference,
                row.points,
                row.form.as_deref().unwrap_or("").replace(',', "")
            )
        })
        .collect()
}

pub fn scorers_header() -> String {
    format!(
        "{:>3} {:<24} {:<5} {:>5} {:>5} {:>4} {:>4}",
        "#", "Player", "Team", "Goals", "Ast", "Pen", "MP"
    )
}

pub fn scorers_lines(state: &AppState) -> Vec<String> {
    let opt = |v: Option<u16>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    state
        .scorers
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            format!(
                "{:>3} {:<24} {:<5} {:>5} {:>5} {:>4} {:>4}",
                idx + 1,
                truncate_chars(&row.player, 24),
                row.team.label(),
                row.goals,
                opt(row.assists),
                opt(row.penalties),
                opt(row.played)
            )
        })
        .collect()
}

/// Header lines of a club sheet; the selectable people follow separately.
pub fn club_header(club: &ClubSheet) -> Vec<String> {
    let mut lines = vec![match &club.tla {
        Some(tla) => format!("{} ({tla})", club.name),
        None => club.name.clone(),
    }];
    if let Some(founded) = club.founded {
        lines.push(format!("Founded: {founded}"));
    }
    for (label, value) in [
        ("Venue", &club.venue),
        ("Colours", &club.colors),
        ("Address", &club.address),
        ("Website", &club.website),
    ] {
        if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
        }
    }
    lines
}

pub fn club_people_lines(club: &ClubSheet) -> Vec<String> {
    let squad = club.squad.iter().map(|p| {
        let num = p
            .shirt_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "--".to_string());
        format!(
            "{num:>2} {:<26} {:<12} {}",
            truncate_chars(&p.name, 26),
            p.position.as_deref().unwrap_or("-"),
            p.nationality.as_deref().unwrap_or("")
        )
    });
    let staff = club.staff.iter().map(|s| {
        format!(
            "   {:<26} {:<12} {}",
            truncate_chars(&s.name, 26),
            s.role,
            s.nationality.as_deref().unwrap_or("")
        )
    });
    squad.chain(staff).collect()
}

pub fn person_text(person: &PersonSheet, today: NaiveDate) -> String {
    let mut lines = vec![person.name.clone()];
    let kind = match person.kind {
        PersonKind::Player => person.position.clone().unwrap_or_else(|| "Player".to_string()),
        PersonKind::Staff => person.role.clone().unwrap_or_else(|| "Staff".to_string()),
    };
    lines.push(kind);
    if let Some(team) = &person.team {
        lines.push(format!("Club: {}", team.name));
    }
    if let Some(number) = person.shirt_number {
        lines.push(format!("Shirt: {number}"));
    }
    if let Some(nationality) = &person.nationality {
        lines.push(format!("Nationality: {nationality}"));
    }
    if let Some(dob) = &person.date_of_birth {
        match age_on(dob, today) {
            Some(age) => lines.push(format!("Born: {} (age {age})", &dob[..dob.len().min(10)])),
            None => lines.push(format!("Born: {dob}")),
        }
    }
    if !person.stats.is_empty() {
        lines.push(String::new());
        for stat in &person.stats {
            lines.push(format!("{:<20} {}", stat.label, stat.value));
        }
    }
    lines.join("\n")
}

pub fn age_on(date_of_birth: &str, today: NaiveDate) -> Option<u32> {
    let raw = date_of_birth.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    let dob = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

pub fn console_text(state: &AppState, max_lines: usize) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(max_lines);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn event_kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Goal => "GOAL",
        EventKind::Card => "CARD",
        EventKind::Sub => "SUB",
        EventKind::Other => "-",
    }
}

/// UTC kickoff shown in the local time zone.
pub fn format_kickoff(raw: &str) -> String {
    match parse_kickoff(raw) {
        Some(dt) => Local
            .from_utc_datetime(&dt)
            .format("%a %d %b %H:%M")
            .to_string(),
        None => fallback_kickoff(raw),
    }
}

pub fn format_kickoff_with_offset(raw: &str, offset: FixedOffset) -> String {
    match parse_kickoff(raw) {
        Some(dt) => offset
            .from_utc_datetime(&dt)
            .format("%a %d %b %H:%M")
            .to_string(),
        None => fallback_kickoff(raw),
    }
}

fn kickoff_time_only(raw: &str) -> String {
    match parse_kickoff(raw) {
        Some(dt) => Local.from_utc_datetime(&dt).format("%H:%M").to_string(),
        None => "TBD".to_string(),
    }
}

fn fallback_kickoff(raw: &str) -> String {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return "TBD".to_string();
    }
    cleaned.replace('T', " ")
}

fn parse_kickoff(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw.trim().trim_end_matches('Z');
    KICKOFF_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
}

pub fn fetched_ago(fetched_at: Option<std::time::SystemTime>) -> String {
    let Some(at) = fetched_at else {
        return "never".to_string();
    };
    let secs = at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

/// Today's date in UTC; person sheets use it for ages.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn truncate_chars(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_respects_birthday() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).expect("date");
        assert_eq!(age_on("2000-06-15", today), Some(26));
        assert_eq!(age_on("2000-06-16", today), Some(25));
        assert_eq!(age_on("2000-06-16T00:00:00Z", today), Some(25));
        assert_eq!(age_on("unknown", today), None);
    }

    #[test]
    fn kickoff_in_fixed_offset() {
        let sgt = FixedOffset::east_opt(8 * 3600).expect("offset");
        assert_eq!(
            format_kickoff_with_offset("2026-06-11T19:00", sgt),
            "Fri 12 Jun 03:00"
        );
        assert_eq!(format_kickoff_with_offset("", sgt), "TBD");
        assert_eq!(format_kickoff_with_offset("next week", sgt), "next week");
    }
}
