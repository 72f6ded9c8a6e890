//! In-memory backend for service and handler tests

use super::traits::{BackendKind, TransactionBackend};
use crate::error::{QueryError, Result};
use crate::query::TransactionFilter;
use crate::results::TransactionRecord;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Returns a canned outcome and remembers the last filter it saw
pub struct FakeBackend {
    kind: BackendKind,
    outcome: std::result::Result<Vec<TransactionRecord>, QueryError>,
    delay: Option<Duration>,
    last_filter: Mutex<Option<TransactionFilter>>,
}

impl FakeBackend {
    pub fn returning(records: Vec<TransactionRecord>) -> Self {
        Self {
            kind: BackendKind::Relational,
            outcome: Ok(records),
            delay: None,
            last_filter: Mutex::new(None),
        }
    }

    pub fn failing(error: QueryError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::returning(vec![])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn last_filter(&self) -> Option<TransactionFilter> {
        self.last_filter.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn fetch(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>> {
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
