//! txn-query: transaction lookups over MySQL or MongoDB
//!
//! One read endpoint, `GET /transactions`, answers "transactions in the last
//! N days matching optional filters" against whichever storage engine is
//! configured, with the same result semantics on both.

pub mod backends;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod results;
pub mod service;
pub mod web;

pub use backends::{BackendKind, BackendLoader, TransactionBackend};
pub use config::Settings;
pub use error::QueryError;
pub use query::{TransactionFilter, TransactionParams};
pub use results::TransactionRecord;
pub use service::QueryService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
