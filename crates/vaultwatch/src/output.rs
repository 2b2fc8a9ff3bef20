//! Output formatting: dashboard tables or JSON.
//!
//! Table output renders the door/LED state, badge ranking, environment
//! panel, and recent access log. JSON output serializes the snapshot as-is.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{self, ClearType},
};
use owo_colors::OwoColorize;
use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::Rect;
use ratatui::widgets::{Sparkline, Widget};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use vaultwatch_core::projector;
use vaultwatch_core::{
    AccessLogEntry, DoorState, EnvMetric, EnvPanel, EnvUnavailable, LedState, RefreshStatus,
    Snapshot,
};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

const BAR_WIDTH: usize = 20;
const SPARK_TOP: u64 = 7;
const SERIES_POINTS: usize = 40;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint_door(door: DoorState, color: bool) -> String {
    let label = door.to_string();
    match (color, door) {
        (false, _) => label,
        (true, DoorState::Ouverte) => label.green().bold().to_string(),
        (true, DoorState::Fermee) => label.red().bold().to_string(),
    }
}

fn paint_led(led: LedState, color: bool) -> String {
    let label = led.to_string();
    if !color {
        return label;
    }
    match led {
        LedState::Verte => label.green().to_string(),
        LedState::Rouge => label.red().to_string(),
        LedState::Orange => label.yellow().to_string(),
        LedState::Blanc => label.dimmed().to_string(),
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Badge")]
    uid: String,
    #[tabled(rename = "Door")]
    door: String,
    #[tabled(rename = "LED")]
    led: String,
}

impl LogRow {
    fn new(entry: &AccessLogEntry, color: bool) -> Self {
        Self {
            time: local_time(entry.timestamp),
            uid: entry.uid.clone(),
            door: paint_door(entry.door, color),
            led: paint_led(entry.led, color),
        }
    }
}

#[derive(Tabled)]
struct BadgeRow {
    #[tabled(rename = "Badge")]
    uid: String,
    #[tabled(rename = "Openings")]
    count: usize,
    #[tabled(rename = "")]
    bar: String,
}

// ── Sections ─────────────────────────────────────────────────────────

/// Horizontal bar scaled against `max`.
pub fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max).min(BAR_WIDTH);
    "█".repeat(width)
}

/// One-line sparkline of `values`, scaled to their own range.
///
/// Rendered with ratatui's `Sparkline` into an off-screen buffer so the
/// glyphs match the ones the widget draws in a full terminal UI.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn sparkline(values: &[f64]) -> String {
    let width = u16::try_from(values.len()).unwrap_or(u16::MAX);
    if width == 0 {
        return String::new();
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = max - min;
    // Level 1 is the lowest visible bar; 0 would render blank.
    let levels: Vec<u64> = values
        .iter()
        .map(|v| {
            if span > 0.0 {
                1 + (((v - min) / span) * SPARK_TOP as f64).round() as u64
            } else {
                1
            }
        })
        .collect();

    let area = Rect::new(0, 0, width, 1);
    let mut buf = Buffer::empty(area);
    Sparkline::default()
        .data(&levels)
        .max(SPARK_TOP + 1)
        .render(area, &mut buf);
    buf.content().iter().map(Cell::symbol).collect()
}

fn render_header(snapshot: &Snapshot, color: bool) -> String {
    let current = &snapshot.current;
    format!(
        "Door {}   LED {}   last badge {} at {}\nOpenings: {}",
        paint_door(current.door, color),
        paint_led(current.led, color),
        current.uid,
        local_time(current.as_of),
        snapshot.stats.open_count,
    )
}

fn render_badges(snapshot: &Snapshot) -> Option<String> {
    let ranked = snapshot.stats.ranked();
    let max = ranked.first().map_or(0, |(_, count)| *count);
    if max == 0 {
        return None;
    }
    let rows: Vec<BadgeRow> = ranked
        .into_iter()
        .map(|(uid, count)| BadgeRow {
            uid: uid.to_owned(),
            count,
            bar: bar(count, max),
        })
        .collect();
    Some(Table::new(rows).with(Style::rounded()).to_string())
}

fn render_env(panel: &EnvPanel, color: bool) -> String {
    match panel {
        EnvPanel::Available { latest, history } => {
            let fire = match (latest.fire, color) {
                (true, true) => "FIRE".red().bold().to_string(),
                (true, false) => "FIRE".to_owned(),
                (false, _) => "none".to_owned(),
            };
            let mut out = format!(
                "Environment ({})\n  Temperature {:.1} °C   Humidity {:.0} %   Light {:.0}   Air quality {:.0}   Fire {}",
                local_time(latest.timestamp),
                latest.temperature,
                latest.humidity,
                latest.light,
                latest.air_quality,
                fire,
            );
            if history.len() > 1 {
                for (label, metric) in [
                    ("Temperature", EnvMetric::Temperature),
                    ("Humidity   ", EnvMetric::Humidity),
                ] {
                    let points = projector::series(history, metric);
                    let start = points.len().saturating_sub(SERIES_POINTS);
                    let values: Vec<f64> = points.iter().skip(start).map(|(_, v)| *v).collect();
                    let _ = write!(out, "\n  {label} {}", sparkline(&values));
                }
            }
            out
        }
        EnvPanel::Unavailable { reason } => {
            let why = match reason {
                EnvUnavailable::NoData => "no readings recorded".to_owned(),
                EnvUnavailable::FetchFailed { reason } => reason.clone(),
            };
            let line = format!("Environment unavailable ({why})");
            if color { line.dimmed().to_string() } else { line }
        }
    }
}

fn render_log(snapshot: &Snapshot, rows: usize, color: bool) -> Option<String> {
    if rows == 0 {
        return None;
    }
    let rows: Vec<LogRow> = snapshot
        .logs_desc()
        .into_iter()
        .take(rows)
        .map(|e| LogRow::new(e, color))
        .collect();
    Some(Table::new(rows).with(Style::rounded()).to_string())
}

fn render_status_line(status: &RefreshStatus, skipped: usize, color: bool) -> String {
    let mut line = match status {
        RefreshStatus::Never => "Waiting for first refresh".to_owned(),
        RefreshStatus::Fresh { at } => format!("Updated {}", local_time(*at)),
        RefreshStatus::Stale { since, error } => {
            let text = format!("STALE since {}: {error}", local_time(*since));
            if color { text.yellow().to_string() } else { text }
        }
    };
    if skipped > 0 {
        let _ = write!(line, " ({skipped} malformed records skipped)");
    }
    line
}

// ── Dashboard ────────────────────────────────────────────────────────

/// JSON shape of the dashboard.
#[derive(Serialize)]
struct DashboardReport<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale_since: Option<DateTime<Utc>>,
    snapshot: Option<&'a Snapshot>,
}

/// Render the dashboard in the chosen format.
pub fn render_dashboard(
    format: OutputFormat,
    snapshot: Option<&Snapshot>,
    status: &RefreshStatus,
    history_rows: usize,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let (label, error, stale_since) = match status {
                RefreshStatus::Never => ("never", None, None),
                RefreshStatus::Fresh { .. } => ("fresh", None, None),
                RefreshStatus::Stale { since, error } => {
                    ("stale", Some(error.to_string()), Some(*since))
                }
            };
            let report = DashboardReport {
                status: label,
                error,
                stale_since,
                snapshot,
            };
            Ok(if format == OutputFormat::Json {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            })
        }
        OutputFormat::Table => {
            let Some(snapshot) = snapshot else {
                return Ok(render_status_line(status, 0, color));
            };
            let mut sections = vec![render_header(snapshot, color)];
            sections.extend(render_badges(snapshot));
            sections.push(render_env(&snapshot.env, color));
            sections.extend(render_log(snapshot, history_rows, color));
            sections.push(render_status_line(status, snapshot.skipped_records, color));
            Ok(sections.join("\n\n"))
        }
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Clear the terminal before a redraw. No-op when stdout is piped.
pub fn clear_screen() -> io::Result<()> {
    let mut stdout = io::stdout();
    if stdout.is_terminal() {
        stdout
            .execute(terminal::Clear(ClearType::All))?
            .execute(cursor::MoveTo(0, 0))?;
    }
    Ok(())
}
