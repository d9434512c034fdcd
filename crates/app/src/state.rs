//! Application state management

use std::sync::{Arc, Mutex, MutexGuard};

use civicdesk_core::bot::seed_defaults;
use civicdesk_core::{Config, Database, EngineSettings, Error, Result, RuleCache};

/// Main application state
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    /// Trigger rules, swept by the background sweeper
    pub rule_cache: Arc<RuleCache>,
    pub settings: EngineSettings,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        if config.seed_defaults {
            seed_defaults(&db)?;
        }

        tracing::info!(path = %db_path.display(), "Database ready");

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            rule_cache: Arc::new(RuleCache::new(config.bot.rule_cache_ttl())),
            settings: config.engine_settings(),
        })
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::InvalidOperation("database lock poisoned".into()))
    }
}
