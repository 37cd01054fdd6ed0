use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock_store::{ClockStore, MemoryClockStore};

/// How far (in whole minutes) the server may disagree with the running
/// baseline before the baseline is thrown away.
pub const DRIFT_TOLERANCE_MINUTES: u16 = 2;
pub const SECOND_HALF_OFFSET: u16 = 45;
pub const SECOND_HALF_FLOOR: u16 = SECOND_HALF_OFFSET + 1;
pub const MAX_DISPLAY_MINUTE: u16 = 130;
pub const DEFAULT_FINAL_MINUTE: u16 = 90;

// Used only when a match is live and the server gave us nothing at all.
const FALLBACK_LIVE_MINUTE: u16 = 1;
const MINUTE_MS: i64 = 60_000;
const PHASE_OFFSETS: [u16; 4] = [0, 45, 90, 105];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Paused,
    Finished,
    Postponed,
    Suspended,
    Cancelled,
    Unknown,
}

impl MatchStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "SCHEDULED" | "TIMED" | "NS" | "NOT_STARTED" => Self::Scheduled,
            "LIVE" | "IN_PLAY" | "INPLAY" | "1H" | "2H" | "ET" | "FIRST_HALF" | "SECOND_HALF" => {
                Self::Live
            }
            "HT" | "PAUSED" | "HALF_TIME" | "HALFTIME" | "BREAK" => Self::Paused,
            "FT" | "FINISHED" | "AWARDED" | "AET" | "PEN" | "FULL_TIME" => Self::Finished,
            "POSTPONED" | "PST" => Self::Postponed,
            "SUSPENDED" | "INTERRUPTED" => Self::Suspended,
            "CANCELLED" | "CANCELED" | "ABANDONED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn is_live(self) -> bool {
        self == Self::Live
    }

    pub fn is_break(self) -> bool {
        self == Self::Paused
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Finished
    }

    /// Live or in a break: the match is in progress and worth polling fast.
    pub fn in_progress(self) -> bool {
        self.is_live() || self.is_break()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Live => "LIVE",
            Self::Paused => "HT",
            Self::Finished => "FT",
            Self::Postponed => "POSTPONED",
            Self::Suspended => "SUSPENDED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "-",
        }
    }
}

/// One server observation of a match clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub status: MatchStatus,
    /// Raw "current minute" field. May be stale around half boundaries.
    pub minute: Option<u16>,
    pub phase_start: Option<DateTime<Utc>>,
    /// 0 for the first half, 45 for the second, 90/105 for extra time.
    pub phase_offset: Option<u16>,
}

impl ClockSnapshot {
    pub fn new(status: MatchStatus) -> Self {
        Self {
            status,
            minute: None,
            phase_start: None,
            phase_offset: None,
        }
    }

    pub fn with_minute(mut self, minute: u16) -> Self {
        self.minute = Some(minute);
        self
    }

    pub fn with_phase(mut self, start: DateTime<Utc>, offset: u16) -> Self {
        self.phase_start = Some(start);
        self.phase_offset = Some(offset);
        self
    }

    fn effective_offset(&self) -> u16 {
        if let Some(offset) = self.phase_offset {
            return offset;
        }
        let minute = self.minute.unwrap_or(0);
        PHASE_OFFSETS
            .iter()
            .rev()
            .copied()
            .find(|offset| minute > *offset)
            .unwrap_or(0)
    }
}

/// Authoritative minute at `now`. The phase reconstruction wins over the raw
/// minute field whenever a phase start is known.
pub fn server_minute_now(snapshot: &ClockSnapshot, now: DateTime<Utc>) -> Option<u16> {
    if let Some(start) = snapshot.phase_start {
        let elapsed = whole_minutes_between(start.timestamp_millis(), now.timestamp_millis());
        return Some(snapshot.effective_offset().saturating_add(elapsed));
    }
    snapshot.minute
}

fn whole_minutes_between(from_ms: i64, to_ms: i64) -> u16 {
    let elapsed = to_ms.saturating_sub(from_ms).max(0) / MINUTE_MS;
    u16::try_from(elapsed).unwrap_or(u16::MAX)
}

/// Persisted anchor of a running clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockBaseline {
    pub minute: u16,
    pub established_at_ms: i64,
}

impl ClockBaseline {
    pub fn new(minute: u16, established_at: DateTime<Utc>) -> Self {
        Self {
            minute,
            established_at_ms: established_at.timestamp_millis(),
        }
    }

    pub fn projected(&self, now: DateTime<Utc>) -> u16 {
        self.minute.saturating_add(whole_minutes_between(
            self.established_at_ms,
            now.timestamp_millis(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockDisplay {
    #[default]
    Hidden,
    Running(u16),
    Break,
    Final(u16),
}

impl ClockDisplay {
    pub fn label(self) -> String {
        match self {
            Self::Hidden => String::new(),
            Self::Running(minute) => format!("{minute}'"),
            Self::Break => "HT".to_string(),
            Self::Final(_) => "FT".to_string(),
        }
    }

    pub fn minute(self) -> Option<u16> {
        match self {
            Self::Running(minute) | Self::Final(minute) => Some(minute),
            Self::Hidden | Self::Break => None,
        }
    }
}

/// Minute estimator for a single match.
#[derive(Debug, Clone)]
pub struct LiveClock {
    match_id: String,
    last_status: Option<MatchStatus>,
    last_snapshot: Option<ClockSnapshot>,
    baseline: Option<ClockBaseline>,
    floor: u16,
    high_water: u16,
    display: ClockDisplay,
}

impl LiveClock {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            last_status: None,
            last_snapshot: None,
            baseline: None,
            floor: 0,
            high_water: 0,
            display: ClockDisplay::Hidden,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn display(&self) -> ClockDisplay {
        self.display
    }

    pub fn baseline(&self) -> Option<ClockBaseline> {
        self.baseline
    }

    pub fn last_status(&self) -> Option<MatchStatus> {
        self.last_status
    }

    /// Feed a server observation. Unchanged snapshots only tick.
    pub fn sync(
        &mut self,
        snapshot: &ClockSnapshot,
        store: &mut dyn ClockStore,
        now: DateTime<Utc>,
    ) -> ClockDisplay {
        if self.last_snapshot.as_ref() == Some(snapshot) {
            return self.tick(now);
        }
        self.last_snapshot = Some(*snapshot);
        let previous = self.last_status.replace(snapshot.status);

        match snapshot.status {
            MatchStatus::Live => self.sync_live(snapshot, previous, store, now),
            MatchStatus::Paused => {
                self.stop(store);
                self.display = ClockDisplay::Break;
            }
            status if status.is_terminal() => {
                self.stop(store);
                let final_minute = snapshot
                    .minute
                    .filter(|minute| *minute > 0)
                    .unwrap_or(DEFAULT_FINAL_MINUTE)
                    .min(MAX_DISPLAY_MINUTE);
                self.display = ClockDisplay::Final(final_minute);
            }
            _ => {
                self.stop(store);
                self.display = ClockDisplay::Hidden;
            }
        }
        self.display
    }

    /// Advance the running display from the baseline. No-op outside LIVE.
    pub fn tick(&mut self, now: DateTime<Utc>) -> ClockDisplay {
        if self.last_status != Some(MatchStatus::Live) {
            return self.display;
        }
        let Some(baseline) = self.baseline else {
            return self.display;
        };
        let minute = baseline
            .projected(now)
            .max(self.floor)
            .max(self.high_water)
            .min(MAX_DISPLAY_MINUTE);
        self.high_water = minute;
        self.display = ClockDisplay::Running(minute);
        self.display
    }

    fn sync_live(
        &mut self,
        snapshot: &ClockSnapshot,
        previous: Option<MatchStatus>,
        store: &mut dyn ClockStore,
        now: DateTime<Utc>,
    ) {
        let stored = self.baseline.or_else(|| store.load(&self.match_id));
        let reloaded = previous.is_none() && stored.is_some();
        let was_live = previous == Some(MatchStatus::Live) || reloaded;
        let resumed_from_break = previous.is_some_and(MatchStatus::is_break);

        let phase_floor = if snapshot.effective_offset() > 0 {
            snapshot.effective_offset().saturating_add(1)
        } else if resumed_from_break {
            SECOND_HALF_FLOOR
        } else {
            0
        };

        if was_live {
            self.floor = self.floor.max(phase_floor);
        } else {
            self.floor = phase_floor;
            self.high_water = 0;
        }
        let authoritative = server_minute_now(snapshot, now);
        let needs_reset = match stored {
            None => true,
            Some(_) if !was_live => true,
            Some(baseline) => authoritative.is_some_and(|minute| {
                minute.abs_diff(baseline.projected(now)) > DRIFT_TOLERANCE_MINUTES
            }),
        };

        // After a reload the persisted projection is a floor for the display,
        // unless phase data has just replaced it. A bare raw minute may be the
        // same stale value seen before the reload.
        if reloaded
            && let Some(baseline) = stored
            && !(needs_reset && snapshot.phase_start.is_some())
        {
            self.high_water = baseline.projected(now).min(MAX_DISPLAY_MINUTE);
        }

        let baseline = if needs_reset {
            let baseline = self.fresh_baseline(snapshot, authoritative, now);
            store.save(&self.match_id, baseline);
            baseline
        } else {
            // `stored` is Some whenever no reset is needed.
            stored.unwrap_or_else(|| ClockBaseline::new(self.floor, now))
        };
        self.baseline = Some(baseline);
        self.tick(now);
    }

    fn fresh_baseline(
        &self,
        snapshot: &ClockSnapshot,
        authoritative: Option<u16>,
        now: DateTime<Utc>,
    ) -> ClockBaseline {
        let start = authoritative
            .unwrap_or(FALLBACK_LIVE_MINUTE)
            .max(self.floor)
            .min(MAX_DISPLAY_MINUTE);

        // Anchor on the phase's own minute boundary so ticks land when the real
        // clock turns over. A floored start may anchor slightly in the future;
        // the projection holds at `start` until then.
        if let Some(phase_start) = snapshot.phase_start
            && authoritative.is_some()
        {
            let into_phase = i64::from(start.saturating_sub(snapshot.effective_offset()));
            return ClockBaseline {
                minute: start,
                established_at_ms: phase_start.timestamp_millis() + into_phase * MINUTE_MS,
            };
        }
        ClockBaseline::new(start, now)
    }

    fn stop(&mut self, store: &mut dyn ClockStore) {
        store.clear(&self.match_id);
        self.baseline = None;
        self.floor = 0;
        self.high_water = 0;
    }
}

/// All live clocks of the current view plus their baseline store.
#[derive(Debug)]
pub struct ClockBoard {
    clocks: HashMap<String, LiveClock>,
    store: Box<dyn ClockStore>,
}

impl Default for ClockBoard {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ClockBoard {
    pub fn new(store: Box<dyn ClockStore>) -> Self {
        Self {
            clocks: HashMap::new(),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryClockStore::default()))
    }

    pub fn sync(
        &mut self,
        match_id: &str,
        snapshot: &ClockSnapshot,
        now: DateTime<Utc>,
    ) -> ClockDisplay {
        let clock = self
            .clocks
            .entry(match_id.to_string())
            .or_insert_with(|| LiveClock::new(match_id));
        clock.sync(snapshot, self.store.as_mut(), now)
    }

    /// Returns true when any visible minute changed.
    pub fn tick_all(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        for clock in self.clocks.values_mut() {
            let before = clock.display();
            if clock.tick(now) != before {
                changed = true;
            }
        }
        changed
    }

    pub fn display(&self, match_id: &str) -> ClockDisplay {
        self.clocks
            .get(match_id)
            .map(LiveClock::display)
            .unwrap_or_default()
    }

    pub fn clock(&self, match_id: &str) -> Option<&LiveClock> {
        self.clocks.get(match_id)
    }

    /// Drops in-memory clocks; persisted baselines stay for a later reload.
    pub fn forget(&mut self, match_id: &str) {
        self.clocks.remove(match_id);
    }

    pub fn retain_ids(&mut self, keep: &HashSet<&str>) {
        self.clocks.retain(|id, _| keep.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.clocks.clear();
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    pub fn store(&self) -> &dyn ClockStore {
        self.store.as_ref()
    }
}
