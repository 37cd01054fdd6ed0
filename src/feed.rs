use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::state::{Delta, MatchSummary, ProviderCommand};

const LOOP_SLEEP: Duration = Duration::from_millis(500);

/// Polls the REST backend and serves UI commands until the command channel closes.
pub fn spawn_provider(
    config: AppConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let api = ApiClient::from_config(&config);
        let mut provider = Provider {
            api,
            tx,
            competition: config
                .competitions
                .first()
                .cloned()
                .unwrap_or_else(|| "PL".to_string()),
            live_poll: config.live_poll,
            idle_poll: config.idle_poll,
            details_poll: config.details_poll,
            matches: Vec::new(),
            last_matches_fetch: None,
            last_detail_fetch: HashMap::new(),
        };

        loop {
            provider.maybe_refresh_matches();
            provider.maybe_refresh_live_details();

            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => provider.handle(cmd),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            thread::sleep(LOOP_SLEEP);
        }
    })
}

struct Provider {
    api: ApiClient,
    tx: Sender<Delta>,
    competition: String,
    live_poll: Duration,
    idle_poll: Duration,
    details_poll: Duration,
    matches: Vec<MatchSummary>,
    last_matches_fetch: Option<Instant>,
    last_detail_fetch: HashMap<String, Instant>,
}

impl Provider {
    fn poll_interval(&self) -> Duration {
        if self.matches.iter().any(|m| m.status.in_progress()) {
            self.live_poll
        } else {
            self.idle_poll
        }
    }

    fn maybe_refresh_matches(&mut self) {
        let due = self
            .last_matches_fetch
            .is_none_or(|last| last.elapsed() >= self.poll_interval());
        if due {
            self.refresh_matches();
        }
    }

    fn refresh_matches(&mut self) {
        self.last_matches_fetch = Some(Instant::now());
        match self.api.fetch_matches(&self.competition) {
            Ok(fetched) => {
                self.matches = fetched.value.clone();
                let _ = self.tx.send(Delta::SetMatches {
                    competition: self.competition.clone(),
                    matches: fetched.value,
                    stale: fetched.stale,
                });
            }
            Err(err) => self.warn(format!("Matches fetch error: {err:#}")),
        }
    }

    fn maybe_refresh_live_details(&mut self) {
        let live: Vec<String> = self
            .matches
            .iter()
            .filter(|m| m.status.in_progress())
            .map(|m| m.id.clone())
            .collect();
        for match_id in live {
            let due = self
                .last_detail_fetch
                .get(&match_id)
                .is_none_or(|last| last.elapsed() >= self.details_poll);
            if due {
                self.fetch_match_detail(&match_id);
            }
        }
        self.last_detail_fetch
            .retain(|id, _| self.matches.iter().any(|m| &m.id == id));
    }

    fn fetch_match_detail(&mut self, match_id: &str) {
        self.last_detail_fetch
            .insert(match_id.to_string(), Instant::now());
        match self.api.fetch_match_detail(match_id) {
            Ok(fetched) => {
                let mut summary = fetched.value.summary;
                if let Some(summary) = summary.as_mut() {
                    if summary.competition.is_empty() {
                        summary.competition = self.competition.clone();
                    }
                    if let Some(existing) = self.matches.iter_mut().find(|m| m.id == summary.id) {
                        *existing = summary.clone();
                    }
                }
                let _ = self.tx.send(Delta::SetMatchDetail {
                    id: match_id.to_string(),
                    summary,
                    detail: fetched.value.detail,
                });
            }
            Err(err) => self.warn(format!("Match {match_id} details error: {err:#}")),
        }
    }

    fn handle(&mut self, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::RefreshMatches => self.refresh_matches(),
            ProviderCommand::FetchMatchDetail { match_id } => self.fetch_match_detail(&match_id),
            ProviderCommand::FetchStandings => match self.api.fetch_standings(&self.competition) {
                Ok(fetched) => {
                    self.note_stale(fetched.stale, "standings");
                    let _ = self.tx.send(Delta::SetStandings {
                        competition: self.competition.clone(),
                        rows: fetched.value,
                    });
                }
                Err(err) => self.warn(format!("Standings fetch error: {err:#}")),
            },
            ProviderCommand::FetchScorers => match self.api.fetch_scorers(&self.competition) {
                Ok(fetched) => {
                    self.note_stale(fetched.stale, "scorers");
                    let _ = self.tx.send(Delta::SetScorers {
                        competition: self.competition.clone(),
                        rows: fetched.value,
                    });
                }
                Err(err) => self.warn(format!("Scorers fetch error: {err:#}")),
            },
            ProviderCommand::FetchClub { club_id } => match self.api.fetch_club(club_id) {
                Ok(fetched) => {
                    self.note_stale(fetched.stale, "club");
                    let _ = self.tx.send(Delta::SetClub(fetched.value));
                }
                Err(err) => self.warn(format!("Club {club_id} fetch error: {err:#}")),
            },
            ProviderCommand::FetchPlayer { player_id } => match self.api.fetch_player(player_id) {
                Ok(fetched) => {
                    self.note_stale(fetched.stale, "player");
                    let _ = self.tx.send(Delta::SetPerson(fetched.value));
                }
                Err(err) => self.warn(format!("Player {player_id} fetch error: {err:#}")),
            },
            ProviderCommand::FetchStaff { staff_id } => match self.api.fetch_staff(staff_id) {
                Ok(fetched) => {
                    self.note_stale(fetched.stale, "staff");
                    let _ = self.tx.send(Delta::SetPerson(fetched.value));
                }
                Err(err) => self.warn(format!("Staff {staff_id} fetch error: {err:#}")),
            },
            ProviderCommand::SetCompetition { code } => {
                if code != self.competition {
                    self.competition = code;
                    self.matches.clear();
                    self.last_detail_fetch.clear();
                    self.refresh_matches();
                }
            }
        }
    }

    fn note_stale(&self, stale: bool, what: &str) {
        if stale {
            let _ = self
                .tx
                .send(Delta::Log(format!("[INFO] Offline: cached {what} shown")));
        }
    }

    fn warn(&self, msg: String) {
        let _ = self.tx.send(Delta::Log(format!("[WARN] {msg}")));
    }
}
