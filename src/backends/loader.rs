//! Backend loader for building the configured storage adapter

use super::document::DocumentBackend;
use super::relational::RelationalBackend;
use super::traits::{BackendKind, TransactionBackend};
use crate::config::Settings;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Builds exactly one backend from settings, once, at startup
pub struct BackendLoader;

impl BackendLoader {
    /// Validate settings and create the configured backend
    pub async fn load(settings: &Settings) -> Result<Arc<dyn TransactionBackend>> {
        let kind = settings.validate()?;

        let backend: Arc<dyn TransactionBackend> = match kind {
            BackendKind::Relational => Arc::new(RelationalBackend::connect_lazy(&settings.database)?),
            BackendKind::Document => Arc::new(DocumentBackend::connect(&settings.database).await?),
        };

        info!("Loaded {} backend ({})", kind, kind.engine());
        Ok(backend)
    }
}
