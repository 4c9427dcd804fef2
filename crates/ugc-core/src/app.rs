//! Application root
//!
//! Owns the database and the one `SessionManager`; every consumer borrows
//! or clones the handle from here.

use std::sync::Arc;

use ugc_session::{DatabaseTokenStorage, HttpTransport, Session, SessionManager, Transport};
use ugc_storage::Database;

use crate::config::Config;
use crate::Result;

pub struct App {
    config: Config,
    db: Database,
    session: SessionManager,
}

impl App {
    /// Open storage and build the HTTP client. No network traffic happens
    /// until [`App::start`].
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let transport = HttpTransport::new(&config.api_base_url, config.request_timeout)?;

        tracing::info!(
            api = %transport.base_url(),
            database = %config.database_path.display(),
            "App initialized"
        );

        Ok(Self::with_parts(config, db, Arc::new(transport)))
    }

    /// Assemble from an already-open database and any transport
    pub fn with_parts(config: Config, db: Database, transport: Arc<dyn Transport>) -> Self {
        let storage = Arc::new(DatabaseTokenStorage::new(db.clone()));
        let session = SessionManager::new(storage, transport, config.session_config());

        Self {
            config,
            db,
            session,
        }
    }

    /// Restore the persisted session, if any
    pub async fn start(&self) -> Session {
        let session = self.session.initialize().await;
        tracing::info!(status = %session.status, "Session ready");
        session
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
