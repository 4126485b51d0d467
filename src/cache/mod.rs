//! Cache module for keeping the last downloaded dataset on disk
//!
//! A single file holds the raw response of the most recent successful download.
//! It is reused only while it passes the freshness heuristic; otherwise the
//! fetcher goes back to the network and overwrites it.

mod manager;

pub use manager::{freshness_marker, is_fresh, CacheStore};
