//! covidrate library
//!
//! The binary is a thin wrapper around these modules so that loading,
//! aggregation and presentation can be tested without a terminal.

pub mod aggregate;
pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod ui;
