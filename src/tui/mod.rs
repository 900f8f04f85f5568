//! TUI module - progress dashboard with ratatui

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use std::io::{Stdout, stdout};
use tracing::debug;

use crate::db::Database;
use crate::kpi::{
    self, Aggregation, Axis, ExerciseFilter, Metric, Period, percentage_change, period, relative_to_baseline, series,
};
use crate::medals::MedalTotals;
use crate::workout::WorkoutSession;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App {
    db: Database,
    /// Remote client whose cached sessions are shown; `None` for the offline log
    client: Option<String>,
    sessions: Vec<WorkoutSession>,
    filter: ExerciseFilter,
    metric: usize,
    period: usize,
    axis: usize,
    now: DateTime<Utc>,
    should_quit: bool,
}

impl App {
    pub fn new(db: Database, client: Option<String>, sessions: Vec<WorkoutSession>, filter: ExerciseFilter) -> Self {
        let period = Period::all()
            .iter()
            .position(|p| *p == Period::default())
            .unwrap_or(0);
        Self {
            db,
            client,
            sessions,
            filter,
            metric: 0,
            period,
            axis: 0,
            now: Utc::now(),
            should_quit: false,
        }
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn metric(&self) -> Metric {
        Metric::all()[self.metric]
    }

    fn period(&self) -> Period {
        Period::all()[self.period]
    }

    fn axis(&self) -> Axis {
        Axis::all()[self.axis]
    }

    fn cycle_metric(&mut self, forward: bool) {
        let n = Metric::all().len();
        self.metric = if forward { (self.metric + 1) % n } else { (self.metric + n - 1) % n };
    }

    fn cycle_period(&mut self) {
        self.period = (self.period + 1) % Period::all().len();
    }

    fn cycle_axis(&mut self) {
        self.axis = (self.axis + 1) % Axis::all().len();
    }

    /// Re-read sessions from the local store
    fn reload(&mut self) -> Result<()> {
        self.sessions = match &self.client {
            Some(client) => self.db.cached_sessions(client)?.unwrap_or_default(),
            None => self.db.log_sessions()?,
        };
        self.now = Utc::now();
        debug!(count = self.sessions.len(), "dashboard reloaded");
        Ok(())
    }

    fn windowed(&self) -> Vec<WorkoutSession> {
        kpi::filter_by_period(&self.sessions, self.period(), self.now)
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
            .split(area);

        let metric = self.metric();
        let mut title = format!(
            "TotalGains | {} {} | {}",
            metric.icon(),
            metric.name(),
            self.period().label()
        );
        if metric.uses_filters() {
            if let Some(muscle) = &self.filter.muscle {
                title.push_str(&format!(" | {muscle}"));
            }
            if let Some(exercise) = &self.filter.exercise {
                title.push_str(&format!(" | {exercise}"));
            }
        }
        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL).title(self.source_label()));
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let sessions = self.windowed();
        match metric.aggregation() {
            Aggregation::Series => self.render_series(frame, body[0], &sessions),
            Aggregation::Period => self.render_balance(frame, body[0], &sessions),
        }
        self.render_summary(frame, body[1], &sessions);

        let footer = Paragraph::new("q: quit | m/M: metric | p: period | a: axis | r: reload")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn source_label(&self) -> String {
        match &self.client {
            Some(client) => format!("client {client}"),
            None => "offline log".to_string(),
        }
    }

    fn render_series(&self, frame: &mut Frame, area: Rect, sessions: &[WorkoutSession]) {
        let metric = self.metric();
        let axis = self.axis();
        let series = series(sessions, metric, &self.filter, axis);
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        let relative = relative_to_baseline(&values);

        let rows: Vec<Row> = series
            .iter()
            .zip(&relative)
            .map(|(point, rel)| {
                Row::new(vec![
                    Cell::from(point.label.clone()),
                    Cell::from(metric.format(point.value)),
                    Cell::from(point.samples.to_string()),
                    Cell::from(format!("{rel:+.1}%")),
                    Cell::from(point.exercises.join(", ")),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(if axis == Axis::Week { 8 } else { 18 }),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Min(10),
            ],
        )
        .header(Row::new(vec![axis.label(), "Value", "Samples", "vs first", "PRs"]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title(metric.description()));

        frame.render_widget(table, area);
    }

    fn render_balance(&self, frame: &mut Frame, area: Rect, sessions: &[WorkoutSession]) {
        let rows: Vec<Row> = period::muscle_balance(sessions)
            .into_iter()
            .map(|share| {
                Row::new(vec![
                    Cell::from(share.muscle),
                    Cell::from(format!("{:.0} kg", share.volume)),
                    Cell::from(format!("{:.1}%", share.share)),
                    Cell::from(period::share_bar(share.share)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(14),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Min(6),
            ],
        )
        .header(Row::new(vec!["Muscle", "Volume", "Share", ""]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title(Metric::MuscleBalance.description()));

        frame.render_widget(table, area);
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect, sessions: &[WorkoutSession]) {
        let metric = self.metric();
        let mut lines = Vec::new();

        if metric.aggregation() == Aggregation::Series {
            let values: Vec<f64> = series(sessions, metric, &self.filter, self.axis())
                .iter()
                .map(|p| p.value)
                .collect();
            let change = percentage_change(&values);
            let color = if change >= 0.0 { Color::Green } else { Color::Red };
            lines.push(Line::from(vec![
                Span::raw("Change: "),
                Span::styled(format!("{change:+.1}%"), Style::default().fg(color).bold()),
            ]));
        }

        let useful = period::useful_volume(sessions);
        let compliance = period::compliance_total(sessions);
        lines.push(Line::from(format!(
            "Useful volume: {:.0} / {:.0} kg ({:.1}%)",
            useful.useful, useful.total, useful.percentage
        )));
        lines.push(Line::from(format!(
            "Compliance: {}/{} sets ({:.1}%)",
            compliance.in_range, compliance.total, compliance.percentage
        )));
        lines.push(Line::from(format!("Sessions: {}", sessions.len())));
        lines.push(Line::from(""));

        // Medals count everything ever logged, not just the window
        for medal in MedalTotals::from_sessions(&self.sessions).medals() {
            lines.push(Line::from(format!(
                "{} {:<7} {:<11} {:>9.0} {}",
                medal.tier.icon,
                medal.table.name(),
                medal.tier.label,
                medal.value,
                progress_bar(medal.progress, 10)
            )));
        }

        let summary = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Summary"));
        frame.render_widget(summary, area);
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('m') | KeyCode::Right => self.cycle_metric(true),
            KeyCode::Char('M') | KeyCode::Left => self.cycle_metric(false),
            KeyCode::Char('p') => self.cycle_period(),
            KeyCode::Char('a') => self.cycle_axis(),
            KeyCode::Char('r') => self.reload()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.handle_key(key.code)?;
        }
        Ok(())
    }
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LogEntry;
    use crate::workout::{Exercise, WorkoutSet};
    use chrono::Duration;
    use ratatui::backend::TestBackend;

    fn recent_session(days_ago: i64, load: f64) -> WorkoutSession {
        WorkoutSession::new(
            Utc::now() - Duration::days(days_ago),
            None,
            vec![Exercise::new("Bench", "CHEST", vec![WorkoutSet::new(10, load); 2])],
        )
    }

    fn app() -> App {
        let db = Database::open(":memory:").unwrap();
        App::new(db, None, vec![recent_session(1, 50.0)], ExerciseFilter::default())
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_starts_on_volume_all_time() {
        let app = app();
        assert_eq!(app.metric(), Metric::Volume);
        assert_eq!(app.period(), Period::All);
    }

    #[test]
    fn test_metric_cycles_both_ways() {
        let mut app = app();
        app.handle_key(KeyCode::Char('M')).unwrap();
        assert_eq!(app.metric(), Metric::SessionRpe);
        app.handle_key(KeyCode::Char('m')).unwrap();
        assert_eq!(app.metric(), Metric::Volume);
        app.handle_key(KeyCode::Char('p')).unwrap();
        assert_eq!(app.period(), Period::Week);
        app.handle_key(KeyCode::Char('q')).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_axis_cycles_and_relabels_table() {
        let mut app = app();
        assert_eq!(app.axis(), Axis::Week);
        app.handle_key(KeyCode::Char('a')).unwrap();
        assert_eq!(app.axis(), Axis::Date);

        let date = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
        let text = screen(&app);
        assert!(text.contains(&date));
        assert!(text.contains("1000 kg"));

        app.handle_key(KeyCode::Char('a')).unwrap();
        app.handle_key(KeyCode::Char('a')).unwrap();
        assert_eq!(app.axis(), Axis::Week);
    }

    #[test]
    fn test_reload_reads_offline_log() {
        let mut app = app();
        let entries = LogEntry::from_session(&recent_session(2, 60.0));
        app.db.add_log_entries(&entries).unwrap();

        app.reload().unwrap();
        assert_eq!(app.sessions.len(), 1);
        assert_eq!(app.sessions[0].volume(), 1200.0);
    }

    #[test]
    fn test_renders_series_table() {
        let text = screen(&app());
        assert!(text.contains("Volume"));
        assert!(text.contains("1000 kg"));
        assert!(text.contains("Rookie"));
    }

    #[test]
    fn test_renders_balance() {
        let mut app = app();
        app.metric = Metric::all().iter().position(|m| *m == Metric::MuscleBalance).unwrap();
        let text = screen(&app);
        assert!(text.contains("CHEST"));
        assert!(text.contains("100.0%"));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(2.0, 4), "[####]");
    }
}
