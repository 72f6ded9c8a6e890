//! Metrics collection module
//!
//! Tracks query volume, latency and failures by error kind for `/stats`.

use crate::error::QueryError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide query counters
#[derive(Debug, Default)]
pub struct Metrics {
    total_queries: AtomicU64,
    successes: AtomicU64,
    /// Sum of successful query latencies in ms
    success_time_ms: AtomicU64,
    records_returned: AtomicU64,
    empty_results: AtomicU64,
    invalid_parameter_errors: AtomicU64,
    configuration_errors: AtomicU64,
    connectivity_errors: AtomicU64,
    timeout_errors: AtomicU64,
    execution_errors: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment total query count
    pub fn inc_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful query
    pub fn record_success(&self, time_ms: u64, records: usize) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.success_time_ms.fetch_add(time_ms, Ordering::Relaxed);
        self.records_returned.fetch_add(records as u64, Ordering::Relaxed);
        if records == 0 {
            self.empty_results.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a failed query
    pub fn record_error(&self, error: &QueryError) {
        let counter = match error {
            QueryError::InvalidParameter(_) => &self.invalid_parameter_errors,
            QueryError::Configuration(_) => &self.configuration_errors,
            QueryError::Connectivity(_) => &self.connectivity_errors,
            QueryError::Timeout(_) => &self.timeout_errors,
            QueryError::Execution(_) => &self.execution_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total queries
    pub fn get_total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    /// Average latency of successful queries
    pub fn get_avg_response_time(&self) -> Option<u64> {
        let successes = self.successes.load(Ordering::Relaxed);
        if successes == 0 {
            None
        } else {
            Some(self.success_time_ms.load(Ordering::Relaxed) / successes)
        }
    }

    /// Percentage of queries that did not fail
    pub fn get_reliability(&self) -> f64 {
        let total = self.get_total_queries();
        if total == 0 {
            100.0
        } else {
            (self.successes.load(Ordering::Relaxed) as f64 / total as f64) * 100.0
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> QueryStats {
        QueryStats {
            total_queries: self.get_total_queries(),
            successes: self.successes.load(Ordering::Relaxed),
            records_returned: self.records_returned.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            avg_response_time_ms: self.get_avg_response_time(),
            reliability: self.get_reliability(),
            errors: ErrorStats {
                invalid_parameter: self.invalid_parameter_errors.load(Ordering::Relaxed),
                configuration: self.configuration_errors.load(Ordering::Relaxed),
                connectivity: self.connectivity_errors.load(Ordering::Relaxed),
                timeout: self.timeout_errors.load(Ordering::Relaxed),
                execution: self.execution_errors.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable view of [`Metrics`]
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub successes: u64,
    pub records_returned: u64,
    pub empty_results: u64,
    pub avg_response_time_ms: Option<u64>,
    pub reliability: f64,
    pub errors: ErrorStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub invalid_parameter: u64,
    pub configuration: u64,
    pub connectivity: u64,
    pub timeout: u64,
    pub execution: u64,
}
