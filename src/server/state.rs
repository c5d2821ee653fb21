//! Application state shared by all handlers

use anyhow::Result;

use crate::classifier::ClassifierConfig;
use crate::db::Database;
use crate::engine::ComplianceEngine;
use crate::storage::MediaStore;
use crate::utils::AppConfig;

pub struct AppState {
    pub engine: ComplianceEngine,
    /// Settings reported by the AI status endpoint
    pub classifier: ClassifierConfig,
}

impl AppState {
    pub fn new(engine: ComplianceEngine, classifier: ClassifierConfig) -> Self {
        Self { engine, classifier }
    }

    /// Open the database and wire the engine to the configured vision service
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let db_path = crate::db::get_db_path(&config.data_dir)?;
        tracing::info!("Opening database: {}", db_path.display());
        let db = Database::open(&db_path)?;

        let media = MediaStore::new(&config.media_root);
        let engine = ComplianceEngine::with_vision_client(db, media, config.classifier.clone())?
            .with_stale_after(config.stale_after);

        if config.classifier.is_configured() {
            tracing::info!(model = %config.classifier.model, "AI vision service configured");
        } else {
            tracing::warn!("AI vision service not configured, evaluations will use the offline classifier");
        }

        Ok(Self::new(engine, config.classifier.clone()))
    }

    pub fn db(&self) -> &Database {
        self.engine.database()
    }
}
