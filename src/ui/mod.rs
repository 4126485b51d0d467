//! Chart presentation for covidrate
//!
//! This module contains the chart model and the renderers that display it,
//! using the ratatui library for the terminal view.

pub mod presenter;
pub mod rate_chart;

pub use presenter::{present, ChartRenderer, PlainRenderer, TerminalRenderer};
pub use rate_chart::RateChart;
