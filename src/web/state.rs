//! Application state shared across handlers

use crate::backends::TransactionBackend;
use crate::config::Settings;
use crate::metrics::Metrics;
use crate::service::QueryService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
    /// Query service bound to the configured backend
    pub service: Arc<QueryService>,
}

impl AppState {
    /// Create new application state
    pub fn new(settings: Settings, backend: Arc<dyn TransactionBackend>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let service = Arc::new(QueryService::from_settings(&settings, backend, metrics));

        Self {
            settings: Arc::new(settings),
            service,
        }
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    /// Whether /stats is exposed
    pub fn metrics_enabled(&self) -> bool {
        self.settings.general.enable_metrics
    }
}
