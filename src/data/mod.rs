//! Daily per-state testing records
//!
//! This module contains the typed form of one entry of the daily states
//! dataset, plus the parsing and error types used while loading it.

pub mod fetcher;

pub use fetcher::{
    Backoff, DataFetcher, DatasetSource, FetchError, HttpSource, RetryPolicy, DEFAULT_DATASET_URL,
};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use thiserror::Error;

/// Errors that end a run before any chart is shown
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Every download attempt failed
    #[error("data unavailable after {attempts} attempts: {last}")]
    Unavailable {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        last: FetchError,
    },

    /// The dataset is not a JSON array of objects
    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One state's statistics for one date
///
/// Every statistic is optional. A missing key, an explicit `null` and a value
/// of the wrong type all mean "no data", which is never the same thing as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDailyRecord {
    /// Report date (`YYYYMMDD` on the wire)
    #[serde(default, deserialize_with = "deserialize_report_date")]
    pub date: Option<NaiveDate>,
    /// Two-letter state code
    #[serde(default, deserialize_with = "deserialize_text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub positive: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub negative: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub pending: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub hospitalized_currently: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub hospitalized_cumulative: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub in_icu_currently: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub in_icu_cumulative: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub on_ventilator_currently: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub on_ventilator_cumulative: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub death: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub hospitalized: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_test_results: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub pos_neg: Option<i64>,
    /// FIPS state code, published as a string
    #[serde(default, deserialize_with = "deserialize_text")]
    pub fips: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub death_increase: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub hospitalized_increase: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub negative_increase: Option<i64>,
    /// New positive results reported on this date
    #[serde(default, deserialize_with = "deserialize_count")]
    pub positive_increase: Option<i64>,
    /// New test results reported on this date
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_test_results_increase: Option<i64>,
}

impl StateDailyRecord {
    /// Returns `(date, positive_increase, total_test_results_increase)` when all
    /// three are present, which is the only case where a record can feed the
    /// positive rate.
    pub fn daily_increments(&self) -> Option<(NaiveDate, i64, i64)> {
        Some((
            self.date?,
            self.positive_increase?,
            self.total_test_results_increase?,
        ))
    }
}

/// Parses the raw dataset into records, preserving source order
///
/// # Returns
/// * `Ok(Vec<StateDailyRecord>)` - one record per array entry
/// * `Err(DatasetError::Malformed)` - if the text is not an array of objects;
///   a bad value inside an object only blanks that field
pub fn parse_records(raw: &str) -> Result<Vec<StateDailyRecord>, DatasetError> {
    Ok(serde_json::from_str(raw)?)
}

/// Accepts `20200101` or `"20200101"`; anything else, including an
/// impossible calendar date, maps to `None`
fn deserialize_report_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let digits = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().map(|n| n.to_string()),
        Some(Value::String(s)) => Some(s.trim().to_string()),
        _ => None,
    };
    Ok(digits.as_deref().and_then(parse_compact_date))
}

/// Reads a count; whole-number floats are kept, any other value is absent
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => count_from_number(&n),
        _ => None,
    })
}

fn count_from_number(n: &Number) -> Option<i64> {
    if let Some(count) = n.as_i64() {
        return Some(count);
    }
    let value = n.as_f64()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// Reads a code published as text; numbers are kept in their decimal form
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parses an 8-digit `YYYYMMDD` string
fn parse_compact_date(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
