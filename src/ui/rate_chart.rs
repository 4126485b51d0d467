//! Positive rate chart
//!
//! `RateChart` holds the date-sorted series for one query; `render` draws it as
//! a line chart with truncated date labels on the x axis.

use chrono::NaiveDate;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::aggregate::AggregatePoint;

/// X axis title
pub const X_AXIS_LABEL: &str = "date";

/// Y axis title
pub const Y_AXIS_LABEL: &str = "positive rate(%)";

/// Horizontal room reserved per date label
const LABEL_WIDTH: u16 = 8;

/// Date-sorted series ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct RateChart {
    title: String,
    points: Vec<AggregatePoint>,
}

impl RateChart {
    /// Creates a chart, sorting `points` by ascending date
    pub fn new(title: impl Into<String>, mut points: Vec<AggregatePoint>) -> Self {
        points.sort_by_key(|p| p.date());
        Self {
            title: title.into(),
            points,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn points(&self) -> &[AggregatePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point with the greatest date
    pub fn latest(&self) -> Option<&AggregatePoint> {
        self.points.last()
    }

    /// Truncated display label for every point, in order
    pub fn date_labels(&self) -> Vec<String> {
        self.points.iter().map(|p| date_label(p.date())).collect()
    }

    /// `(index, rate)` pairs; dates are plotted as evenly spaced categories
    pub fn series(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.positive_rate()))
            .collect()
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let last = self.points.len().saturating_sub(1).max(1);
        [0.0, last as f64]
    }

    /// Y range covering every rate, starting at zero unless a rate is negative
    pub fn y_bounds(&self) -> [f64; 2] {
        let (lo, hi) = self
            .points
            .iter()
            .map(|p| p.positive_rate())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), r| (lo.min(r), hi.max(r)));
        let top = hi + (hi - lo) * 0.1;
        if top > lo {
            [lo, top]
        } else {
            [lo, lo + 1.0]
        }
    }

    /// At most `max_ticks` labels, evenly spaced, always including the first
    /// and last dates
    pub fn tick_labels(&self, max_ticks: usize) -> Vec<String> {
        tick_indices(self.points.len(), max_ticks)
            .into_iter()
            .map(|i| date_label(self.points[i].date()))
            .collect()
    }
}

/// Date with the year dropped, e.g. `07-14`
pub fn date_label(date: NaiveDate) -> String {
    date.format("%m-%d").to_string()
}

/// Evenly spaced indices into a series of `len` items
pub fn tick_indices(len: usize, max_ticks: usize) -> Vec<usize> {
    if len == 0 || max_ticks == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![0];
    }
    let count = max_ticks.clamp(2, len);
    (0..count).map(|i| i * (len - 1) / (count - 1)).collect()
}

/// One-line description of a point for the console
pub fn summary_line(point: &AggregatePoint) -> String {
    format!(
        "Latest data {}, positive: {}, tested: {}, positive rate: {:.2}%",
        point.date().format("%Y-%m-%d"),
        point.positive_increment(),
        point.test_increment(),
        point.positive_rate()
    )
}

/// Draws the chart over the whole frame with a key hint underneath
pub fn render(frame: &mut Frame, chart: &RateChart) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", chart.title()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if chart.is_empty() {
        let notice = Paragraph::new("No data for this selection")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(notice, chunks[0]);
    } else {
        let series = chart.series();
        let max_ticks = (chunks[0].width / LABEL_WIDTH).max(2) as usize;
        let x_labels: Vec<Span> = chart
            .tick_labels(max_ticks)
            .into_iter()
            .map(Span::raw)
            .collect();
        let [lo, hi] = chart.y_bounds();
        let y_labels: Vec<Span> = [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|v| Span::raw(format!("{:.1}", v)))
            .collect();

        let dataset = Dataset::default()
            .name("positive rate")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&series);

        let widget = Chart::new(vec![dataset])
            .block(block)
            .x_axis(
                Axis::default()
                    .title(X_AXIS_LABEL)
                    .style(Style::default().fg(Color::Gray))
                    .bounds(chart.x_bounds())
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(Y_AXIS_LABEL)
                    .style(Style::default().fg(Color::Gray))
                    .bounds([lo, hi])
                    .labels(y_labels),
            );
        frame.render_widget(widget, chunks[0]);
    }

    let hint = Paragraph::new("q / Esc / Enter: back to prompt")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, chunks[1]);
}
