//! Command-line interface parsing for covidrate
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `StartupConfig`: where the cache lives, where the dataset comes
//! from, how downloads are retried, and whether to prompt or chart once.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::aggregate::StateFilter;
use crate::cache::CacheStore;
use crate::data::{Backoff, RetryPolicy, DEFAULT_DATASET_URL};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// `--retries 0` would never attempt a download
    #[error("Invalid value for --retries: must be at least 1")]
    ZeroRetries,

    /// `--timeout-secs 0` would fail every attempt immediately
    #[error("Invalid value for --timeout-secs: must be at least 1")]
    ZeroTimeout,

    /// The `--state` value is not a state code or US
    #[error("Invalid state: '{0}'. Use a two-letter state code, or US for all states")]
    InvalidState(String),
}

/// How the delay between download attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffKind {
    /// Same delay every time
    Fixed,
    /// Delay doubles after each failure
    Exponential,
}

/// covidrate - Chart the daily US COVID-19 positive test rate
#[derive(Parser, Debug)]
#[command(name = "covidrate")]
#[command(about = "Daily US COVID-19 positive test rate by state")]
#[command(version)]
pub struct Cli {
    /// Chart one state (or US for all states) and exit instead of prompting
    ///
    /// Examples:
    ///   covidrate --state CA     # California only
    ///   covidrate --state US     # all states combined
    #[arg(long, value_name = "STATE")]
    pub state: Option<String>,

    /// Cache file location (defaults to a file in the system temp directory)
    #[arg(long, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// Dataset URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_DATASET_URL)]
    pub url: String,

    /// Download attempts before giving up
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub retries: u32,

    /// Time limit for each download attempt, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Delay policy between download attempts
    #[arg(long, value_enum, default_value_t = BackoffKind::Fixed)]
    pub backoff: BackoffKind,

    /// Base delay between download attempts, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub backoff_ms: u64,

    /// Ignore the cache and always download
    #[arg(long)]
    pub refresh: bool,

    /// Print the series as a text table instead of opening the chart view
    #[arg(long)]
    pub plain: bool,
}

/// A single selection given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShot {
    /// The value as typed, echoed in the chart title
    pub input: String,
    pub filter: StateFilter,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Chart this selection and exit; `None` runs the prompt loop
    pub one_shot: Option<OneShot>,
    /// Cache slot location
    pub cache_path: PathBuf,
    /// Dataset URL
    pub url: String,
    /// Download retry policy
    pub retry_policy: RetryPolicy,
    /// Skip the cache freshness check
    pub refresh: bool,
    /// Use the text table renderer
    pub plain: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            one_shot: None,
            cache_path: CacheStore::default_path(),
            url: DEFAULT_DATASET_URL.to_string(),
            retry_policy: RetryPolicy::default(),
            refresh: false,
            plain: false,
        }
    }
}

/// Parses a `--state` value into a selection.
///
/// # Returns
/// * `Ok(OneShot)` for `US` or a two-letter code (any case)
/// * `Err(CliError::InvalidState)` otherwise
pub fn parse_state_arg(s: &str) -> Result<OneShot, CliError> {
    let input = s.trim();
    let valid_code = input.len() == 2 && input.chars().all(|c| c.is_ascii_alphabetic());
    match StateFilter::parse(input) {
        Some(filter) if valid_code => Ok(OneShot {
            input: input.to_string(),
            filter,
        }),
        _ => Err(CliError::InvalidState(s.to_string())),
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.retries == 0 {
            return Err(CliError::ZeroRetries);
        }
        if cli.timeout_secs == 0 {
            return Err(CliError::ZeroTimeout);
        }

        let one_shot = cli.state.as_deref().map(parse_state_arg).transpose()?;

        let base = Duration::from_millis(cli.backoff_ms);
        let backoff = match cli.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential(base),
        };

        Ok(StartupConfig {
            one_shot,
            cache_path: cli
                .cache_path
                .clone()
                .unwrap_or_else(CacheStore::default_path),
            url: cli.url.clone(),
            retry_policy: RetryPolicy {
                max_attempts: cli.retries,
                timeout: Duration::from_secs(cli.timeout_secs),
                backoff,
            },
            refresh: cli.refresh,
            plain: cli.plain,
        })
    }
}
