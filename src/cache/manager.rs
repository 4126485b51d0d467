//! Single-slot dataset cache
//!
//! Provides a `CacheStore` that keeps the verbatim text of the last successful
//! download in one file. There is no metadata on disk: freshness is inferred by
//! looking for yesterday's date (`YYYYMMDD`) inside the cached text, since the
//! dataset is published once a day.

use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

/// File name used for the cache slot inside the system temp directory
const DEFAULT_CACHE_FILE: &str = "cache_daily_file";

/// Reads and writes the cached dataset
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Location of the cache slot
    path: PathBuf,
}

impl CacheStore {
    /// Creates a CacheStore backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default cache location in the shared temp directory
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_CACHE_FILE)
    }

    /// Returns the location of the cache slot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached dataset if it is fresh as of today (local time)
    pub fn load_cached(&self) -> Option<String> {
        self.load_cached_on(Local::now().date_naive())
    }

    /// Returns the cached dataset if it is fresh as of `today`
    ///
    /// A missing or unreadable file and a stale file are all treated as a miss.
    pub fn load_cached_on(&self, today: NaiveDate) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        is_fresh(&content, today).then_some(content)
    }

    /// Overwrites the cache slot with `raw`
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation or file writing fails
    pub fn store(&self, raw: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, raw)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

/// The date string a fresh dataset must contain: the day before `today`
pub fn freshness_marker(today: NaiveDate) -> Option<String> {
    today
        .pred_opt()
        .map(|yesterday| yesterday.format("%Y%m%d").to_string())
}

/// Whether `content` passes the freshness heuristic for `today`
pub fn is_fresh(content: &str, today: NaiveDate) -> bool {
    freshness_marker(today).is_some_and(|marker| content.contains(&marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_cache() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::new(temp_dir.path().join("daily.json"));
        (cache, temp_dir)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_freshness_marker_is_yesterday() {
        assert_eq!(freshness_marker(day(2020, 7, 15)).as_deref(), Some("20200714"));
    }

    #[test]
    fn test_freshness_marker_crosses_year_boundary() {
        assert_eq!(freshness_marker(day(2021, 1, 1)).as_deref(), Some("20201231"));
    }

    #[test]
    fn test_is_fresh_matches_text_anywhere() {
        let content = r#"[{"date":20200714,"state":"CA"}]"#;
        assert!(is_fresh(content, day(2020, 7, 15)));
        assert!(!is_fresh(content, day(2020, 7, 16)));
    }

    #[test]
    fn test_load_returns_none_for_missing_file() {
        let (cache, _temp_dir) = create_test_cache();
        assert!(cache.load_cached_on(day(2020, 7, 15)).is_none());
    }

    #[test]
    fn test_load_returns_content_when_fresh() {
        let (cache, _temp_dir) = create_test_cache();
        let raw = r#"[{"date":20200714,"state":"NY"}]"#;
        cache.store(raw).expect("Store should succeed");

        let loaded = cache.load_cached_on(day(2020, 7, 15));

        assert_eq!(loaded.as_deref(), Some(raw));
    }

    #[test]
    fn test_load_returns_none_when_stale() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .store(r#"[{"date":20200701,"state":"NY"}]"#)
            .expect("Store should succeed");

        assert!(cache.load_cached_on(day(2020, 7, 15)).is_none());
    }

    #[test]
    fn test_store_overwrites_existing_slot() {
        let (cache, _temp_dir) = create_test_cache();
        cache.store("[20200713]").expect("First store should succeed");
        cache.store("[20200714]").expect("Second store should succeed");

        let content = fs::read_to_string(cache.path()).expect("Should read file");
        assert_eq!(content, "[20200714]");
    }

    #[test]
    fn test_store_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("slot");
        let cache = CacheStore::new(nested.join("daily.json"));

        cache.store("[]").expect("Store should succeed");

        assert!(nested.join("daily.json").exists(), "Cache file should exist");
    }

    #[test]
    fn test_default_path_is_in_temp_dir() {
        let cache = CacheStore::default();
        assert!(cache.path().starts_with(std::env::temp_dir()));
        assert!(cache.path().ends_with(DEFAULT_CACHE_FILE));
    }
}
