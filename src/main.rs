use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use matchday_terminal::clock_store::FileClockStore;
use matchday_terminal::config::{AppConfig, FeedSource};
use matchday_terminal::live_clock::ClockBoard;
use matchday_terminal::state::{
    self, AppState, PersonKind, ProviderCommand, Screen, apply_delta, screen_label, sort_label,
};
use matchday_terminal::{fake_feed, feed, persist, views};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(state: AppState, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.show_tab(Screen::Matches),
            KeyCode::Char('2') => {
                self.state.show_tab(Screen::Standings);
                self.send(ProviderCommand::FetchStandings, false);
            }
            KeyCode::Char('3') => {
                self.state.show_tab(Screen::Scorers);
                self.send(ProviderCommand::FetchScorers, false);
            }
            KeyCode::Enter | KeyCode::Char('d') => {
                if let Some(target) = self.state.selected_target() {
                    self.open(target);
                }
            }
            KeyCode::Char('b') | KeyCode::Esc => self.state.back(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                persist::save_from_state(&self.state);
                self.state.cycle_competition();
                persist::load_into_state(&mut self.state);
                let code = self.state.competition().to_string();
                self.send(ProviderCommand::SetCompetition { code }, false);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh_current(),
            KeyCode::Char('h') => self.open_side_club(true),
            KeyCode::Char('a') => self.open_side_club(false),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn open(&mut self, target: Screen) {
        if let Some(cmd) = fetch_for(&target) {
            self.send(cmd, false);
        }
        self.state.open(target);
    }

    fn open_side_club(&mut self, home: bool) {
        if !matches!(self.state.screen, Screen::Match { .. }) {
            return;
        }
        let Some(m) = self.state.selected_match() else {
            return;
        };
        let team = if home { &m.home } else { &m.away };
        let (club_id, label) = (team.id, team.label().to_string());
        match club_id {
            Some(club_id) => self.open(Screen::Club { club_id }),
            None => self.state.push_log(format!("[INFO] No club page for {label}")),
        }
    }

    fn refresh_current(&mut self) {
        let cmd = match &self.state.screen {
            Screen::Matches => Some(ProviderCommand::RefreshMatches),
            Screen::Standings => Some(ProviderCommand::FetchStandings),
            Screen::Scorers => Some(ProviderCommand::FetchScorers),
            other => fetch_for(other),
        };
        if let Some(cmd) = cmd {
            self.send(cmd, true);
        }
    }

    fn send(&mut self, cmd: ProviderCommand, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            if announce {
                self.state.push_log("[INFO] Feed unavailable");
            }
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Feed stopped; request dropped");
        } else if announce {
            self.state.push_log("[INFO] Refresh requested");
        }
    }
}

fn fetch_for(screen: &Screen) -> Option<ProviderCommand> {
    match screen {
        Screen::Match { match_id } => Some(ProviderCommand::FetchMatchDetail {
            match_id: match_id.clone(),
        }),
        Screen::Club { club_id } => Some(ProviderCommand::FetchClub { club_id: *club_id }),
        Screen::Person {
            person_id,
            kind: PersonKind::Player,
        } => Some(ProviderCommand::FetchPlayer {
            player_id: *person_id,
        }),
        Screen::Person {
            person_id,
            kind: PersonKind::Staff,
        } => Some(ProviderCommand::FetchStaff {
            staff_id: *person_id,
        }),
        Screen::Matches | Screen::Standings | Screen::Scorers => None,
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = AppConfig::from_env();

    let clocks = if config.persist_clocks {
        ClockBoard::new(Box::new(FileClockStore::open_default()))
    } else {
        ClockBoard::in_memory()
    };
    let mut app_state = AppState::with_clocks(&config, clocks);
    persist::load_into_state(&mut app_state);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    match config.feed {
        FeedSource::Api => {
            feed::spawn_provider(config.clone(), tx, cmd_rx);
        }
        FeedSource::Fake => {
            app_state.push_log("[INFO] FEED=fake: simulated matchday");
            fake_feed::spawn_fake_provider(app_state.competition().to_string(), tx, cmd_rx);
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(app_state, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    persist::save_from_state(&app.state);

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.tick_clocks(Utc::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let state = &app.state;
    match &state.screen {
        Screen::Matches => render_matches(frame, chunks[1], state),
        Screen::Match { match_id } => render_match(frame, chunks[1], state, match_id),
        Screen::Standings => render_list(
            frame,
            chunks[1],
            &format!("Standings {}", views::fetched_ago(state.standings_fetched_at)),
            Some(views::standings_header()),
            &views::standings_lines(state),
            state.standings_selected,
            "No standings yet",
        ),
        Screen::Scorers => render_list(
            frame,
            chunks[1],
            &format!("Top scorers {}", views::fetched_ago(state.scorers_fetched_at)),
            Some(views::scorers_header()),
            &views::scorers_lines(state),
            state.scorers_selected,
            "No scorers yet",
        ),
        Screen::Club { club_id } => render_club(frame, chunks[1], state, *club_id),
        Screen::Person { person_id, kind } => {
            let sheet = match kind {
                PersonKind::Player => state.players.get(person_id),
                PersonKind::Staff => state.staff.get(person_id),
            };
            let text = sheet
                .map(|p| views::person_text(p, views::today()))
                .unwrap_or_else(|| "Loading...".to_string());
            let body = Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(Block::default().title("Profile").borders(Borders::ALL));
            frame.render_widget(body, chunks[1]);
        }
    }

    let console_lines = chunks[2].height.saturating_sub(2) as usize;
    let console = Paragraph::new(views::console_text(state, console_lines))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let live = state.live_match_ids().len();
    let title = format!(
        "MATCHDAY | {} | {} | Sort: {} | Live: {live}",
        state.competition(),
        screen_label(&state.screen),
        sort_label(state.sort)
    );
    let offline = if state.matches_stale { "  OFFLINE" } else { "" };
    let line1 = format!("  .-.  {title}");
    let line2 = format!(
        " ( o )  Updated {}{offline}",
        views::fetched_ago(state.matches_fetched_at)
    );
    let line3 = "  '-'".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Matches => {
            "1 Matches | 2 Table | 3 Scorers | Enter Open | j/k Move | s Sort | l Competition | r Refresh | ? Help | q Quit".to_string()
        }
        Screen::Match { .. } => {
            "b/Esc Back | h Home club | a Away club | r Refresh | ? Help | q Quit".to_string()
        }
        Screen::Standings | Screen::Scorers | Screen::Club { .. } => {
            "1 Matches | 2 Table | 3 Scorers | Enter Open | b/Esc Back | j/k Move | r Refresh | q Quit".to_string()
        }
        Screen::Person { .. } => "b/Esc Back | r Refresh | ? Help | q Quit".to_string(),
    }
}

fn render_matches(frame: &mut Frame, area: Rect, state: &AppState) {
    let lines = views::matches_lines(state);
    render_list(
        frame,
        area,
        "Matches",
        None,
        &lines,
        state.matches_selected,
        "No matches for this competition",
    );
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    header: Option<String>,
    lines: &[String],
    selected: usize,
    empty_msg: &str,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let list_area = match header {
        Some(header) => {
            let sections = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(inner);
            let header = Paragraph::new(header).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_widget(header, sections[0]);
            sections[1]
        }
        None => inner,
    };

    if lines.is_empty() {
        let empty = Paragraph::new(empty_msg.to_string()).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return;
    }
    if list_area.height == 0 {
        return;
    }

    let (start, end) = visible_range(selected, lines.len(), list_area.height as usize);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let style = if idx == selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        frame.render_widget(Paragraph::new(lines[idx].clone()).style(style), row_area);
    }
}

fn render_match(frame: &mut Frame, area: Rect, state: &AppState, match_id: &str) {
    let title = match state.matches.iter().find(|m| m.id == match_id) {
        Some(m) => format!(
            "{} {} {}  {}",
            m.home.label(),
            m.score_label(),
            m.away.label(),
            views::clock_label(state, m)
        ),
        None => "Match".to_string(),
    };
    let body = Paragraph::new(views::match_detail_text(state, match_id))
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(body, area);
}

fn render_club(frame: &mut Frame, area: Rect, state: &AppState, club_id: u32) {
    let Some(club) = state.clubs.get(&club_id) else {
        let loading = Paragraph::new("Loading...")
            .block(Block::default().title("Club").borders(Borders::ALL));
        frame.render_widget(loading, area);
        return;
    };

    let header = views::club_header(club);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header.len() as u16 + 2),
            Constraint::Min(1),
        ])
        .split(area);
    let info = Paragraph::new(header.join("\n"))
        .block(Block::default().title("Club").borders(Borders::ALL));
    frame.render_widget(info, sections[0]);

    render_list(
        frame,
        sections[1],
        "Squad & staff",
        None,
        &views::club_people_lines(club),
        state.sheet_selected,
        "No squad listed",
    );
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchday Terminal - Help",
        "",
        "Global:",
        "  1 / 2 / 3    Matches / Table / Scorers",
        "  Enter / d    Open selection",
        "  b / Esc      Back",
        "  l            Next competition",
        "  r            Refresh current screen",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Lists:",
        "  j/k or ↑/↓   Move",
        "  s            Cycle sort mode (matches)",
        "",
        "Match:",
        "  h / a        Home / away club",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
