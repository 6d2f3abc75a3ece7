//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::policy::BanList;
use crate::storage::BlobStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    blobs: BlobStore,
    bans: BanList,
    audit: AuditLog,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool, bans: BanList) -> Self {
        let blobs = BlobStore::new(config.storage.root.clone());
        let audit = AuditLog::new(config.audit_log_path.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                blobs,
                bans,
                audit,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.inner.blobs
    }

    pub fn bans(&self) -> &BanList {
        &self.inner.bans
    }

    pub fn audit(&self) -> &AuditLog {
        &self.inner.audit
    }
}
