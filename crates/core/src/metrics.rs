//! Metrics definitions for the read API.
//!
//! This module defines all metrics recorded by Tally.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

use crate::ports::Direction;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "pagination_requests_total",
        "Total number of paginated listing requests"
    );
    describe_counter!(
        "pagination_cursor_misses_total",
        "Target cursors that were not found in the filtered set"
    );
    describe_histogram!(
        "pagination_query_duration_seconds",
        "Time taken to resolve a page (window + count) in seconds"
    );
    describe_counter!(
        "api_errors_total",
        "Total number of API requests that ended in an error"
    );
}

/// Record a paginated listing request.
///
/// # Arguments
/// * `collection` - The listed collection ("categories", "transactions", ...)
/// * `direction` - The traversal direction
pub fn record_pagination_request(collection: &'static str, direction: Direction) {
    counter!(
        "pagination_requests_total",
        "collection" => collection,
        "direction" => direction.as_str()
    )
    .increment(1);
}

/// Record a target cursor that did not resolve.
pub fn record_cursor_miss(collection: &'static str) {
    counter!("pagination_cursor_misses_total", "collection" => collection).increment(1);
}

/// Record page resolution duration.
pub fn record_query_duration(collection: &'static str, duration_secs: f64) {
    histogram!("pagination_query_duration_seconds", "collection" => collection)
        .record(duration_secs);
}

/// Record an API error.
///
/// # Arguments
/// * `kind` - Error code as returned to the client
pub fn record_api_error(kind: &'static str) {
    counter!("api_errors_total", "kind" => kind).increment(1);
}

/// A timer that records the page resolution duration when dropped.
pub struct QueryTimer {
    collection: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Start a new timer for a collection.
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(self.collection, duration);
    }
}
