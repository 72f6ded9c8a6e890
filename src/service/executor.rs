//! Query execution against the configured backend

use crate::backends::{BackendKind, TransactionBackend};
use crate::config::Settings;
use crate::error::{QueryError, Result};
use crate::metrics::Metrics;
use crate::query::{TransactionFilter, TransactionParams};
use crate::results::TransactionRecord;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Answers transaction queries with the single backend chosen at startup
pub struct QueryService {
    /// Active storage backend
    backend: Arc<dyn TransactionBackend>,
    /// Query counters
    metrics: Arc<Metrics>,
    /// Upper bound for one backend call
    query_timeout: Duration,
}

impl QueryService {
    /// Create a new query service
    pub fn new(backend: Arc<dyn TransactionBackend>, metrics: Arc<Metrics>) -> Self {
        Self {
            backend,
            metrics,
            query_timeout: Duration::from_secs(10),
        }
    }

    /// Create a query service using the configured timeout
    pub fn from_settings(
        settings: &Settings,
        backend: Arc<dyn TransactionBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::new(backend, metrics)
            .with_timeout(Duration::from_secs_f64(settings.database.query_timeout))
    }

    /// Set the per-query timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Which backend answers queries
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run a query relative to the current time
    pub async fn query(&self, params: &TransactionParams) -> Result<Vec<TransactionRecord>> {
        self.query_at(params, Utc::now()).await
    }

    /// Run a query relative to `now`
    pub async fn query_at(
        &self,
        params: &TransactionParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        self.metrics.inc_query();
        let start = Instant::now();

        let result = self.execute(params, now).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(records) => {
                info!(
                    "{} backend returned {} transactions in {:?}",
                    self.backend.kind(),
                    records.len(),
                    elapsed
                );
                self.metrics
                    .record_success(elapsed.as_millis() as u64, records.len());
            }
            Err(e) => {
                warn!(
                    kind = e.kind(),
                    "{} backend query failed after {:?}: {}",
                    self.backend.kind(),
                    elapsed,
                    e
                );
                self.metrics.record_error(e);
            }
        }

        result
    }

    async fn execute(
        &self,
        params: &TransactionParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let filter = TransactionFilter::from_params(params, now)?;

        debug!(
            since = %filter.since_time(),
            constraints = filter.optional_constraints(),
            "Querying {} backend with timeout {:?}",
            self.backend.kind(),
            self.query_timeout
        );

        match timeout(self.query_timeout, self.backend.fetch(&filter)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.query_timeout.as_secs_f64())),
        }
    }
}
