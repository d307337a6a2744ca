use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
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
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};
use tracing::{info, warn};

use matchday_form::config::AppConfig;
use matchday_form::form_state::{AppState, FormFocus, ModelStatus};
use matchday_form::match_record::{FullTimeResult, MatchRecord};
use matchday_form::predictor::Prediction;
use matchday_form::team_form::{TeamFormState, Venue};
use matchday_form::{csv_loader, logging, match_store, model_store, paths};

struct App {
    state: AppState,
    should_quit: bool,
}

impl App {
    fn new(state: AppState) -> Self {
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            match key.code {
                KeyCode::Char('?') | KeyCode::Esc => self.state.help_overlay = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                self.state.toggle_focus()
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter | KeyCode::Char('p') => self.state.predict_selected(),
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }
}

fn load_history(cfg: &AppConfig) -> (Vec<MatchRecord>, String) {
    match csv_loader::load_league(&cfg.data_dir, &cfg.league_prefix) {
        Ok(loaded) => {
            let msg = format!(
                "[INFO] Loaded {} matches from {} file(s) in {}",
                loaded.matches.len(),
                loaded.files.len(),
                cfg.data_dir.display()
            );
            return (loaded.matches, msg);
        }
        Err(err) => warn!(error = %err, "csv history unavailable, trying match store"),
    }

    let Some(db_path) = cfg.db_path.as_ref() else {
        return (Vec::new(), "[WARN] No match history found".to_string());
    };
    if !db_path.exists() {
        return (Vec::new(), "[WARN] No match history found".to_string());
    }
    match match_store::open_db(db_path)
        .and_then(|conn| match_store::load_league_matches(&conn, &cfg.league_prefix))
    {
        Ok(matches) => {
            let msg = format!(
                "[INFO] Loaded {} matches from {}",
                matches.len(),
                db_path.display()
            );
            (matches, msg)
        }
        Err(err) => (Vec::new(), format!("[ERROR] {err:#}")),
    }
}

fn main() -> Result<()> {
    let cfg = AppConfig::from_env();
    if let Some(path) = paths::form_log_path()
        && let Err(err) = logging::init_file_logging(&path)
    {
        eprintln!("file logging disabled: {err:#}");
    }
    info!("starting match form");

    let (history, history_msg) = load_history(&cfg);
    let state = match model_store::load_artifacts(&cfg.models_dir) {
        Ok(artifacts) => AppState::new(history, artifacts),
        Err(err) => AppState::new(history, None).with_model_error(format!("{err:#}")),
    };
    let mut app = App::new(state);
    app.state.push_log(history_msg);
    let model_msg = match &app.state.model_status {
        ModelStatus::Ready => "[INFO] Model loaded".to_string(),
        ModelStatus::Missing => "[WARN] Model unavailable, run `train` first".to_string(),
        ModelStatus::Failed(err) => format!("[ERROR] Model failed to load: {err}"),
    };
    app.state.push_log(model_msg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
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
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_form(frame, chunks[1], &app.state);

    let footer = Paragraph::new(
        "Tab Switch side | j/k/↑/↓ Move | Enter Predict | ? Help | q Quit",
    )
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let model = match &state.model_status {
        ModelStatus::Ready => "model ready",
        ModelStatus::Missing => "model unavailable",
        ModelStatus::Failed(_) => "model error",
    };
    let line1 = format!(
        "  MATCHDAY FORM | {} teams | {} matches | {model}",
        state.teams.len(),
        state.history.len()
    );
    let line2 = match (state.home_team(), state.away_team()) {
        (Some(h), Some(a)) => format!("  {h} v {a}"),
        _ => "  No teams loaded".to_string(),
    };
    format!("{line1}\n{line2}")
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(5)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(26),
            Constraint::Length(26),
            Constraint::Min(30),
        ])
        .split(rows[0]);

    render_team_list(
        frame,
        columns[0],
        state,
        "Home",
        state.home_idx,
        state.focus == FormFocus::Home,
    );
    render_team_list(
        frame,
        columns[1],
        state,
        "Away",
        state.away_idx,
        state.focus == FormFocus::Away,
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(1)])
        .split(columns[2]);
    render_prediction(frame, right[0], state);

    let profiles = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(right[1]);
    let prediction = state.prediction.as_ref();
    render_profile(
        frame,
        profiles[0],
        prediction.map(|p| p.home_team.as_str()),
        prediction.and_then(|p| p.home_form.as_ref()),
        Venue::Home,
    );
    render_profile(
        frame,
        profiles[1],
        prediction.map(|p| p.away_team.as_str()),
        prediction.and_then(|p| p.away_form.as_ref()),
        Venue::Away,
    );

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[1]);
}

fn render_team_list(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    title: &str,
    selected: usize,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(border_style);

    if state.teams.is_empty() {
        let empty = Paragraph::new("No teams")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_range(selected, state.teams.len(), visible);
    let lines: Vec<Line> = (start..end)
        .map(|idx| {
            let name = state.teams[idx].clone();
            if idx == selected {
                let mut style = Style::default().fg(Color::White).bg(Color::DarkGray);
                if focused {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Line::styled(format!("> {name}"), style)
            } else {
                Line::raw(format!("  {name}"))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Prediction").borders(Borders::ALL);
    let Some(prediction) = state.prediction.as_ref() else {
        let msg = match &state.model_status {
            ModelStatus::Ready => "Pick two teams and press Enter".to_string(),
            ModelStatus::Missing => "Model unavailable. Run `train` to build it.".to_string(),
            ModelStatus::Failed(err) => format!("Model unavailable: {err}"),
        };
        let empty = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };
    frame.render_widget(win_bar_chart(prediction).block(block), area);
}

fn win_bar_chart(prediction: &Prediction) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = prediction
        .ranked
        .iter()
        .map(|(result, p)| {
            let color = match result {
                FullTimeResult::HomeWin => Color::Green,
                FullTimeResult::Draw => Color::Yellow,
                FullTimeResult::AwayWin => Color::Red,
            };
            Bar::default()
                .label(Line::from(prediction.label(*result)))
                .value((p * 100.0).round() as u64)
                .text_value(format!("{:.1}%", p * 100.0))
                .style(Style::default().fg(color))
        })
        .collect();

    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .group_gap(0)
        .max(100)
}

fn render_profile(
    frame: &mut Frame,
    area: Rect,
    team: Option<&str>,
    form: Option<&TeamFormState>,
    venue: Venue,
) {
    let title = team.unwrap_or("Team").to_string();
    let body = match (team, form) {
        (None, _) => "No prediction yet".to_string(),
        (Some(_), None) => "No matches on record".to_string(),
        (Some(_), Some(f)) => profile_text(f, venue),
    };
    let profile = Paragraph::new(body).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(profile, area);
}

fn profile_text(f: &TeamFormState, venue: Venue) -> String {
    let v = f.venue(venue);
    let venue_label = match venue {
        Venue::Home => "Home",
        Venue::Away => "Away",
    };
    let form = f.form_string();
    format!(
        "P {}  W-D-L {}-{}-{}\nGoals {}:{} ({:.2} / {:.2})\n{venue_label} W-D-L {}-{}-{} ({:.0}%)\nLast 5: {}\nShots on target {:.2}/m\nCorners {:.2}/m\nCards Y{} R{}",
        f.matches_played,
        f.wins,
        f.draws,
        f.losses,
        f.goals_scored,
        f.goals_conceded,
        f.avg_goals_scored(),
        f.avg_goals_conceded(),
        v.wins,
        v.draws,
        v.losses,
        v.win_ratio() * 100.0,
        if form.is_empty() { "-" } else { form.as_str() },
        f.avg_shots_on_target(),
        f.avg_corners(),
        f.yellow_cards,
        f.red_cards,
    )
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

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No log lines yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchday Form - Help",
        "",
        "  Tab / ←/→    Switch between home and away list",
        "  j/k or ↑/↓   Move selection",
        "  Enter / p    Predict the selected fixture",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Probabilities come from the saved model in the models folder.",
        "Form panels show each side's record before the fixture.",
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
