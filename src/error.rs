//! Error kinds surfaced by the query service
//!
//! Every failure a request can hit is one of these variants. Each maps to a
//! fixed HTTP status and is rendered as `{"error": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors produced while building or executing a transaction query
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Unsupported backend type or otherwise unusable configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A request parameter produced an unusable filter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Connection, authentication or server selection failure
    #[error("backend connectivity error: {0}")]
    Connectivity(String),

    /// The backend did not answer within the configured query timeout
    #[error("backend timed out after {0:.1}s")]
    Timeout(f64),

    /// The backend rejected the query or returned data we could not decode
    #[error("backend execution error: {0}")]
    Execution(String),
}

impl QueryError {
    /// HTTP status for this error kind
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-friendly label, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::Connectivity(_) => "connectivity",
            Self::Timeout(_) => "timeout",
            Self::Execution(_) => "execution",
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connectivity(err.to_string()),
            sqlx::Error::Configuration(_) => Self::Configuration(err.to_string()),
            // Access denied (1044/1045) is raised during the connection handshake
            sqlx::Error::Database(db)
                if matches!(db.code().as_deref(), Some("28000") | Some("42000"))
                    && db.message().contains("denied") =>
            {
                Self::Connectivity(err.to_string())
            }
            _ => Self::Execution(err.to_string()),
        }
    }
}

impl From<mongodb::error::Error> for QueryError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. } => Self::Connectivity(err.to_string()),
            ErrorKind::InvalidArgument { .. } => Self::Configuration(err.to_string()),
            _ => Self::Execution(err.to_string()),
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
