//! covidrate - Chart the daily US COVID-19 positive test rate
//!
//! Loads the daily per-state testing dataset (from a same-day cache when
//! possible), then charts the positive rate for the states the operator asks
//! for, either once from `--state` or repeatedly from an interactive prompt.

use std::io;
use std::panic;
use std::process::ExitCode;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, LeaveAlternateScreen},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use covidrate::app::App;
use covidrate::cache::CacheStore;
use covidrate::cli::{Cli, StartupConfig};
use covidrate::data::{DataFetcher, HttpSource};
use covidrate::ui::{ChartRenderer, PlainRenderer, TerminalRenderer};

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "covidrate=info";

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics mid-chart.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Sends logs to stderr so stdout carries only the prompt and summaries
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Charts the one-shot selection, or runs the prompt loop
fn drive<R: ChartRenderer>(app: &App, config: &StartupConfig, renderer: &mut R) -> io::Result<()> {
    match &config.one_shot {
        Some(selection) => {
            app.show(&selection.input, &selection.filter, renderer, &mut io::stdout())
        }
        None => app.run(io::stdin().lock(), &mut io::stdout(), renderer),
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;

    let fetcher = DataFetcher::new(
        HttpSource::new(),
        CacheStore::new(config.cache_path.clone()),
        config.url.clone(),
        config.retry_policy,
    )
    .with_refresh(config.refresh);

    let records = fetcher.fetch_dataset().await?;
    info!(records = records.len(), "dataset ready");

    let app = App::new(records);
    if config.plain {
        drive(&app, &config, &mut PlainRenderer::new(io::stdout()))?;
    } else {
        drive(&app, &config, &mut TerminalRenderer::new())?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    setup_panic_hook();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
