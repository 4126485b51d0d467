//! Hands an aggregated series to a chart renderer
//!
//! `present` sorts the points, prints the latest-point summary, and passes the
//! chart to a `ChartRenderer`. `TerminalRenderer` shows it full screen and waits
//! for the operator to dismiss it; `PlainRenderer` writes a text table instead.

use std::io::{self, Write};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use super::rate_chart::{self, date_label, summary_line, RateChart};
use crate::aggregate::AggregatePoint;

/// Something that can display a finished chart
pub trait ChartRenderer {
    /// Displays `chart`, returning once the operator is done with it
    fn show(&mut self, chart: &RateChart) -> io::Result<()>;
}

/// Sorts `points`, writes the latest-point summary to `out`, and renders
///
/// Nothing is summarised for an empty series, but the renderer still runs.
pub fn present<R, W>(
    title: &str,
    points: Vec<AggregatePoint>,
    renderer: &mut R,
    out: &mut W,
) -> io::Result<()>
where
    R: ChartRenderer + ?Sized,
    W: Write,
{
    let chart = RateChart::new(title, points);
    if let Some(latest) = chart.latest() {
        writeln!(out, "{}", summary_line(latest))?;
        out.flush()?;
    }
    renderer.show(&chart)
}

/// Keys that close the chart view
pub fn is_dismiss_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter)
}

/// Full-screen chart in the alternate screen
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Puts the terminal back into line mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

impl ChartRenderer for TerminalRenderer {
    fn show(&mut self, chart: &RateChart) -> io::Result<()> {
        let _guard = RawModeGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        loop {
            terminal.draw(|frame| rate_chart::render(frame, chart))?;

            // Any other event (including resize) just triggers a redraw
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && is_dismiss_key(key.code) {
                    return Ok(());
                }
            }
        }
    }
}

/// Writes the series as a text table
#[derive(Debug)]
pub struct PlainRenderer<W: Write> {
    out: W,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartRenderer for PlainRenderer<W> {
    fn show(&mut self, chart: &RateChart) -> io::Result<()> {
        writeln!(self.out, "{}", chart.title())?;
        if chart.is_empty() {
            writeln!(self.out, "  no data")?;
            return self.out.flush();
        }
        writeln!(
            self.out,
            "{:>6}  {:>10}  {:>10}  {:>8}",
            rate_chart::X_AXIS_LABEL,
            "positive",
            "tested",
            "rate(%)"
        )?;
        for point in chart.points() {
            writeln!(
                self.out,
                "{:>6}  {:>10}  {:>10}  {:>8.2}",
                date_label(point.date()),
                point.positive_increment(),
                point.test_increment(),
                point.positive_rate()
            )?;
        }
        self.out.flush()
    }
}
