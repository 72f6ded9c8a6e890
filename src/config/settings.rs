//! Settings structures for txn-query configuration

use crate::backends::BackendKind;
use crate::error::QueryError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Main settings structure matching config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables (TXN_QUERY_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("TXN_QUERY_DEBUG") {
            if let Some(debug) = parse_flag(&val) {
                self.general.debug = debug;
            }
        }
        if let Ok(val) = std::env::var("TXN_QUERY_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("TXN_QUERY_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_TYPE") {
            self.database.kind = val;
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_HOST") {
            self.database.host = val;
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_PORT") {
            if let Ok(port) = val.parse() {
                self.database.port = Some(port);
            }
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_USER") {
            self.database.user = val;
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_PASSWORD") {
            self.database.password = val;
        }
        if let Ok(val) = std::env::var("TXN_QUERY_DB_NAME") {
            self.database.dbname = val;
        }
    }

    /// Check everything that would otherwise only fail once a request arrives.
    ///
    /// Returns the resolved backend so callers do not parse the type twice.
    pub fn validate(&self) -> std::result::Result<BackendKind, QueryError> {
        let kind = self.database.backend_kind()?;

        if !is_valid_identifier(&self.database.table) {
            return Err(QueryError::Configuration(format!(
                "invalid table/collection name '{}'",
                self.database.table
            )));
        }
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(QueryError::Configuration(format!(
                "invalid bind address '{}'",
                self.server.bind_address
            )));
        }
        for (name, value) in [
            ("connect_timeout", self.database.connect_timeout),
            ("query_timeout", self.database.query_timeout),
            ("request_timeout", self.server.request_timeout),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(QueryError::Configuration(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, value
                )));
            }
        }
        if self.database.max_connections == 0 {
            return Err(QueryError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }

        Ok(kind)
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Service name reported by /health
    pub instance_name: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "txn-query".to_string(),
            enable_metrics: true,
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Upper bound for a whole HTTP request in seconds
    pub request_timeout: f64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "127.0.0.1".to_string(),
            request_timeout: 30.0,
        }
    }
}

/// Storage engine settings.
///
/// `type` stays a raw string here so that an unknown value is reported as a
/// configuration error by [`Settings::validate`] instead of a YAML parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Backend type: mysql | mongodb (or relational | document)
    #[serde(rename = "type")]
    pub kind: String,
    pub host: String,
    /// Port (defaults to the engine's standard port)
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    /// Database name
    pub dbname: String,
    /// Table (relational) or collection (document) holding transactions
    pub table: String,
    /// Authentication database for the document store
    pub auth_source: Option<String>,
    /// Pool size
    pub max_connections: u32,
    /// Connection/server selection timeout in seconds
    pub connect_timeout: f64,
    /// Per-query timeout in seconds
    pub query_timeout: f64,
    /// Result ordering on transaction_date
    pub order: ResultOrder,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            kind: "mysql".to_string(),
            host: "localhost".to_string(),
            port: None,
            user: String::new(),
            password: String::new(),
            dbname: "transactions".to_string(),
            table: "transactions".to_string(),
            auth_source: None,
            max_connections: 10,
            connect_timeout: 5.0,
            query_timeout: 10.0,
            order: ResultOrder::default(),
        }
    }
}

impl DatabaseSettings {
    /// Resolve the configured backend type
    pub fn backend_kind(&self) -> std::result::Result<BackendKind, QueryError> {
        self.kind.parse()
    }

    /// Effective port for the given backend
    pub fn port_for(&self, kind: BackendKind) -> u16 {
        self.port.unwrap_or_else(|| kind.default_port())
    }
}

/// Ordering applied to results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Whatever order the engine returns
    #[default]
    Unspecified,
    /// Oldest first
    Ascending,
    /// Newest first
    Descending,
}

/// Accepts `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`
fn is_valid_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Boolean environment values: true/false, 1/0, yes/no, on/off
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5000);
        assert!(!settings.general.debug);
        assert_eq!(settings.database.table, "transactions");
        assert_eq!(settings.validate().unwrap(), BackendKind::Relational);
    }

    #[test]
    fn test_yaml_mongodb() {
        let settings = Settings::from_yaml(
            r#"
database:
  type: mongodb
  host: db.internal
  user: reader
  password: hunter2
  dbname: payments
"#,
        )
        .unwrap();

        assert_eq!(settings.validate().unwrap(), BackendKind::Document);
        assert_eq!(settings.database.port_for(BackendKind::Document), 27017);
        assert_eq!(settings.database.dbname, "payments");
        assert_eq!(settings.database.order, ResultOrder::Unspecified);
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let settings = Settings::from_yaml("database:\n  type: postgres\n").unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_table_identifier_validation() {
        assert!(is_valid_identifier("transactions"));
        assert!(is_valid_identifier("billing.tx_2024"));
        assert!(!is_valid_identifier("tx; DROP TABLE users"));
        assert!(!is_valid_identifier("1tx"));
        assert!(!is_valid_identifier("a.b.c"));
        assert!(!is_valid_identifier(""));

        let mut settings = Settings::default();
        settings.database.table = "tx`--".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let mut settings = Settings::default();
        settings.database.query_timeout = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_order_parsing() {
        let settings = Settings::from_yaml("database:\n  order: descending\n").unwrap();
        assert_eq!(settings.database.order, ResultOrder::Descending);
    }

    #[test]
    fn test_parse_flag() {
        for on in ["true", "1", "YES", " on "] {
            assert_eq!(parse_flag(on), Some(true), "{on}");
        }
        for off in ["false", "0", "No", "off"] {
            assert_eq!(parse_flag(off), Some(false), "{off}");
        }
        assert_eq!(parse_flag("maybe"), None);
    }
}
