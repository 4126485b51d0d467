//! Interactive prompt loop
//!
//! This module holds the loaded records and turns each line of operator input
//! into either the end of the session or one aggregate-and-present cycle.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::aggregate::{aggregate, StateFilter};
use crate::data::StateDailyRecord;
use crate::ui::{present, ChartRenderer};

/// Text shown before each query
pub const PROMPT: &str = "Please input state name to display, US for all, e to exit: ";

/// Input that ends the session
pub const EXIT_TOKEN: &str = "e";

/// One parsed line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Leave the loop
    Exit,
    /// Blank line, prompt again
    Empty,
    /// Chart the given selection
    Show {
        /// Input as typed (trimmed), echoed in the chart title
        input: String,
        filter: StateFilter,
    },
}

/// Parses one line of input
pub fn parse_command(line: &str) -> Command {
    let input = line.trim();
    if input == EXIT_TOKEN {
        return Command::Exit;
    }
    match StateFilter::parse(input) {
        Some(filter) => Command::Show {
            input: input.to_string(),
            filter,
        },
        None => Command::Empty,
    }
}

/// Chart title for a selection, echoing the operator's input
pub fn chart_title(input: &str) -> String {
    format!("Covid19 positive rate for {}", input)
}

/// Loaded dataset plus the query loop over it
pub struct App {
    records: Vec<StateDailyRecord>,
}

impl App {
    /// Creates an App over records that stay loaded for the whole session
    pub fn new(records: Vec<StateDailyRecord>) -> Self {
        Self { records }
    }

    /// Number of loaded records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Runs one aggregate-and-present cycle
    pub fn show<R, W>(
        &self,
        input: &str,
        filter: &StateFilter,
        renderer: &mut R,
        out: &mut W,
    ) -> io::Result<()>
    where
        R: ChartRenderer + ?Sized,
        W: Write,
    {
        let points = aggregate(&self.records, filter);
        present(&chart_title(input), points, renderer, out)
    }

    /// Prompts for selections until the exit token or end of input
    ///
    /// A failed render is logged and the loop carries on; only failing to
    /// write the prompt or read input ends the session with an error.
    pub fn run<I, W, R>(&self, input: I, out: &mut W, renderer: &mut R) -> io::Result<()>
    where
        I: BufRead,
        W: Write,
        R: ChartRenderer + ?Sized,
    {
        let mut lines = input.lines();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(out)?;
                return Ok(());
            };

            match parse_command(&line?) {
                Command::Exit => return Ok(()),
                Command::Empty => continue,
                Command::Show { input, filter } => {
                    if let Err(err) = self.show(&input, &filter, renderer, out) {
                        warn!(state = %input, error = %err, "failed to render chart");
                    }
                }
            }
        }
    }
}
