//! Dataset download with caching and bounded retries
//!
//! `DataFetcher` returns the cached dataset when it is fresh and still parses.
//! Otherwise it asks its `DatasetSource` for the dataset, retrying failed
//! attempts according to a `RetryPolicy`, and writes the first body that parses
//! back into the cache.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::{parse_records, DatasetError, StateDailyRecord};
use crate::cache::CacheStore;

/// Daily per-state dataset published by The COVID Tracking Project
pub const DEFAULT_DATASET_URL: &str = "https://covidtracking.com/api/v1/states/daily.json";

/// Why a single download attempt failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// The attempt did not finish within the per-attempt timeout
    #[error("request timed out")]
    Timeout,

    /// Could not connect to the server
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// The body could not be read or is not a JSON array of objects
    #[error("response could not be decoded: {0}")]
    Decode(String),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else if let (true, Some(status)) = (err.is_status(), err.status()) {
            FetchError::Status(status)
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Where the raw dataset comes from when the cache cannot be used
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Retrieves the raw dataset text from `url`
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// `DatasetSource` backed by an HTTP GET
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Create a new HttpSource with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new HttpSource with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

/// Delay between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// Delay doubles after every failure, starting from the given base
    Exponential(Duration),
}

impl Backoff {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential(base) => {
                let shift = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift)
            }
        }
    }
}

/// How many attempts to make and how long each may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Wait between attempts
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            timeout: Duration::from_secs(10),
            backoff: Backoff::Fixed(Duration::from_secs(1)),
        }
    }
}

/// Returns the dataset from cache or network
#[derive(Debug, Clone)]
pub struct DataFetcher<S = HttpSource> {
    source: S,
    cache: CacheStore,
    url: String,
    policy: RetryPolicy,
    /// Skip the cache lookup and always download
    refresh: bool,
}

impl<S: DatasetSource> DataFetcher<S> {
    /// Creates a fetcher reading `url` through `source`, caching into `cache`
    pub fn new(source: S, cache: CacheStore, url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            source,
            cache,
            url: url.into(),
            policy,
            refresh: false,
        }
    }

    /// Always download, even if the cache is fresh
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Fetches the dataset, judging cache freshness against today's local date
    pub async fn fetch_dataset(&self) -> Result<Vec<StateDailyRecord>, DatasetError> {
        self.fetch_dataset_on(Local::now().date_naive()).await
    }

    /// Fetches the dataset, judging cache freshness against `today`
    ///
    /// A fresh cache entry that no longer parses counts as a miss.
    ///
    /// # Returns
    /// * `Ok(Vec<StateDailyRecord>)` - the cached records or the first successful download
    /// * `Err(DatasetError::Unavailable)` - if every attempt failed; the cache
    ///   is left as it was
    pub async fn fetch_dataset_on(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<StateDailyRecord>, DatasetError> {
        if !self.refresh {
            if let Some(cached) = self.cache.load_cached_on(today) {
                match parse_records(&cached) {
                    Ok(records) => {
                        info!(path = %self.cache.path().display(), "using cached dataset");
                        return Ok(records);
                    }
                    Err(err) => {
                        warn!(path = %self.cache.path().display(), error = %err, "ignoring unreadable cache");
                    }
                }
            }
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(attempt, url = %self.url, "start loading data");

            match self.fetch_once().await {
                Ok((raw, records)) => {
                    if let Err(err) = self.cache.store(&raw) {
                        warn!(path = %self.cache.path().display(), error = %err, "failed to write dataset cache");
                    }
                    info!(attempt, records = records.len(), "data loaded");
                    return Ok(records);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "data load failed");
                    if attempt >= max_attempts {
                        return Err(DatasetError::Unavailable {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.policy.backoff.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<(String, Vec<StateDailyRecord>), FetchError> {
        let raw = tokio::time::timeout(self.policy.timeout, self.source.get(&self.url))
            .await
            .map_err(|_| FetchError::Timeout)??;
        let records = decode_body(&raw)?;
        Ok((raw, records))
    }
}

/// Parses a downloaded body; a body that fails here never reaches the cache
fn decode_body(raw: &str) -> Result<Vec<StateDailyRecord>, FetchError> {
    parse_records(raw).map_err(|e| FetchError::Decode(e.to_string()))
}
