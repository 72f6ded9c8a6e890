//! Backend traits and types

use crate::error::{QueryError, Result};
use crate::query::TransactionFilter;
use crate::results::TransactionRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported storage engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// MySQL, queried with parameterized SQL
    Relational,
    /// MongoDB, queried with a filter document
    Document,
}

impl BackendKind {
    /// Accepted spellings of `database.type`
    pub const ACCEPTED: &'static [&'static str] =
        &["mysql", "relational", "mongodb", "mongo", "document"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
        }
    }

    /// Name of the concrete engine behind this kind
    pub fn engine(&self) -> &'static str {
        match self {
            Self::Relational => "mysql",
            Self::Document => "mongodb",
        }
    }

    /// Standard port of the concrete engine
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Relational => 3306,
            Self::Document => 27017,
        }
    }
}

impl FromStr for BackendKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "relational" => Ok(Self::Relational),
            "mongodb" | "mongo" | "document" => Ok(Self::Document),
            other => Err(QueryError::Configuration(format!(
                "unsupported database type '{}' (expected one of: {})",
                other,
                Self::ACCEPTED.join(", ")
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A storage engine able to answer a [`TransactionFilter`].
///
/// Implementations translate the filter into their native query, run it to
/// completion and return every matching record. No partial results: either
/// the whole set or an error.
#[async_trait]
pub trait TransactionBackend: Send + Sync {
    /// Which engine this is
    fn kind(&self) -> BackendKind;

    /// Fetch all transactions matching the filter
    async fn fetch(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>>;
}
