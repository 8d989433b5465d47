//! Ratatui-based terminal UI.
//!
//! Left: the variable list (failed series are marked). Right: a Plotters chart
//! of the selected variable's history and forecast, with its forecast table
//! below. ←/→ change the horizon and refit the whole dataset.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table},
};

use crate::app::pipeline::{RunOutput, run_forecast, run_forecast_with_dataset, write_debug, write_exports};
use crate::domain::{ForecastConfig, ForecastResult, SarimaOrder, SeriesFailure, decimal_year, month_label};
use crate::error::AppError;

mod plotters_chart;

use plotters_chart::ForecastPlottersChart;

/// Start the TUI on the configured input.
pub fn run(config: ForecastConfig) -> Result<(), AppError> {
    // Load before touching the terminal so data errors print normally.
    let output = run_forecast(&config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, output);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// One row of the variable list, in dataset order.
enum Entry<'a> {
    Ok(&'a ForecastResult),
    Failed(&'a SeriesFailure),
}

struct App {
    config: ForecastConfig,
    run: RunOutput,
    selected: usize,
    status: String,
}

impl App {
    fn new(config: ForecastConfig, run: RunOutput) -> Self {
        let status = format!(
            "{} forecast, {} failed",
            run.batch.successes.results.len(),
            run.batch.failures.len()
        );
        Self {
            config,
            run,
            selected: 0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.run.dataset.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Left => self.set_horizon(self.config.horizon.shorter()),
            KeyCode::Right => self.set_horizon(self.config.horizon.longer()),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('d') => {
                self.status = match write_debug(&self.config, &self.run) {
                    Ok(path) => format!("Wrote debug bundle: {}", path.display()),
                    Err(err) => format!("Debug write failed: {err}"),
                };
            }
            _ => {}
        }
        false
    }

    fn set_horizon(&mut self, horizon: crate::domain::Horizon) {
        if horizon == self.config.horizon {
            self.status = format!("horizon stays at {horizon} months (1-36)");
            return;
        }
        self.config.horizon = horizon;
        self.refit();
        self.status = format!("horizon: {horizon} months");
    }

    fn refit(&mut self) {
        let dataset = self.run.dataset.clone();
        self.run = run_forecast_with_dataset(&self.config, dataset);
    }

    fn export(&mut self) {
        if self.run.batch.all_failed() {
            self.status = "Nothing to export: every series failed.".to_string();
            return;
        }
        let config = ForecastConfig {
            no_export: false,
            debug: false,
            ..self.config.clone()
        };
        self.status = match write_exports(&config, &self.run) {
            Ok(paths) => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!("Wrote {}", names.join(", "))
            }
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn entries(&self) -> Vec<(String, Entry<'_>)> {
        self.run
            .dataset
            .series()
            .iter()
            .filter_map(|s| {
                let name = s.name().to_string();
                if let Some(r) = self.run.batch.successes.get(s.name()) {
                    Some((name, Entry::Ok(r)))
                } else {
                    self.run
                        .batch
                        .failures
                        .iter()
                        .find(|f| f.variable == s.name())
                        .map(|f| (name, Entry::Failed(f)))
                }
            })
            .collect()
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let trailing = if self.config.trailing_point.extra_points() > 0 { " +1" } else { "" };
        let lines = vec![
            Line::from(vec![
                Span::styled("sf", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" - {}", self.config.input.display())),
            ]),
            Line::from(Span::styled(
                format!(
                    "model: {} | horizon: {} months{trailing} | rows: {} | last date: {}",
                    SarimaOrder::MONTHLY.display_name(),
                    self.config.horizon,
                    self.run.dataset.rows_read,
                    self.run.dataset.last_date(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(0)])
            .split(area);

        let entries = self.entries();
        self.draw_variables(frame, cols[0], &entries);

        match entries.get(self.selected).map(|(_, e)| e) {
            Some(Entry::Ok(result)) => {
                let table_height = (result.points.len() as u16 + 3).min(cols[1].height / 2);
                let right = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(table_height)])
                    .split(cols[1]);
                draw_chart(frame, right[0], result);
                draw_table(frame, right[1], result);
            }
            Some(Entry::Failed(failure)) => {
                let p = Paragraph::new(failure.to_string())
                    .style(Style::default().fg(Color::Red))
                    .block(Block::default().title("Not forecast").borders(Borders::ALL));
                frame.render_widget(p, cols[1]);
            }
            None => {
                let p = Paragraph::new("No variables.").block(Block::default().borders(Borders::ALL));
                frame.render_widget(p, cols[1]);
            }
        }
    }

    fn draw_variables(&self, frame: &mut ratatui::Frame<'_>, area: Rect, entries: &[(String, Entry<'_>)]) {
        let items: Vec<ListItem> = entries
            .iter()
            .map(|(name, entry)| match entry {
                Entry::Ok(_) => ListItem::new(name.clone()),
                Entry::Failed(_) => ListItem::new(format!("{name} (failed)")).style(Style::default().fg(Color::Red)),
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Variables").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ variable  ←/→ horizon  e export  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, result: &ForecastResult) {
    let block = Block::default()
        .title(format!("{} forecast", result.variable))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let series = chart_series(result);
    let (chart_rect, insets) = chart_layout(inner);
    let widget = ForecastPlottersChart {
        history: &series.history,
        forecast_line: &series.forecast_line,
        forecast: &series.forecast,
        x_bounds: series.x_bounds,
        y_bounds: series.y_bounds,
        y_label: &result.variable,
        fmt_x: month_label,
        fmt_y: fmt_axis_y,
    };

    frame.render_widget(widget, chart_rect);
    if let Some(insets) = insets {
        draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
    }
}

fn draw_table(frame: &mut ratatui::Frame<'_>, area: Rect, result: &ForecastResult) {
    let rows = result.points.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.date.format("%Y-%m-%d").to_string()),
            Cell::from(format!("{:>10}", p.value)),
        ])
    });
    let header = Row::new(vec!["date", "     value"]).style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, [Constraint::Length(12), Constraint::Length(12)])
        .header(header)
        .block(Block::default().title("Forecast").borders(Borders::ALL));
    frame.render_widget(table, area);
}

/// Chart data for one variable, in decimal-year coordinates.
struct ChartSeries {
    history: Vec<(f64, f64)>,
    forecast_line: Vec<(f64, f64)>,
    forecast: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(result: &ForecastResult) -> ChartSeries {
    let history: Vec<(f64, f64)> = result
        .history
        .points()
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (decimal_year(d), v))
        .collect();
    let forecast: Vec<(f64, f64)> = result
        .points
        .iter()
        .map(|p| (decimal_year(p.date), p.value as f64))
        .collect();

    let mut forecast_line = Vec::with_capacity(forecast.len() + 1);
    forecast_line.extend(history.last().copied());
    forecast_line.extend(forecast.iter().copied());

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in history.iter().chain(&forecast) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
        x_min = 0.0;
        x_max = 1.0;
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        let mid = if y_min.is_finite() { y_min } else { 0.0 };
        y_min = mid - 1.0;
        y_max = mid + 1.0;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    ChartSeries {
        history,
        forecast_line,
        forecast,
        x_bounds: [x_min, x_max],
        y_bounds: [y_min - pad, y_max + pad],
    }
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 4usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = month_label(x_val);
        let label_len = label.len() as u16;
        // Keep the last label inside the chart.
        let start = x
            .saturating_sub(label_len / 2)
            .min((chart.x + chart.width).saturating_sub(label_len));
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_y(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("month")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}
