//! Global application state shared across all handlers

use beacon_core_manifest::{ManifestStore, RuleSet};
use beacon_sentinel::{HealthSnapshot, Monitor, Origin, StatusBroadcast};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Global application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Persisted manifest; writes to bucket and manifest go through
    /// this lock so uploads stay atomic with respect to each other
    pub store: Arc<RwLock<ManifestStore>>,

    /// Classification rules applied to uploaded filenames
    pub rules: Arc<RuleSet>,

    /// Directory holding the content-addressed asset files
    pub bucket_dir: Arc<PathBuf>,

    /// Configured origins in preference order
    pub origins: Arc<Vec<Origin>>,

    /// Live health map maintained by the sentinel monitor
    pub health: Arc<RwLock<HealthSnapshot>>,

    /// Broadcast channel for health snapshots (SSE fan-out)
    pub status: StatusBroadcast,
}

impl AppState {
    /// Create application state wired to a running monitor
    ///
    /// The bucket directory is created if missing and the persisted
    /// manifest is reconciled against the files it currently holds:
    /// entries for vanished files are dropped, unmanifested files are
    /// classified, and surviving entries keep their stored attributes
    /// across restarts.
    pub fn new(
        bucket_dir: impl Into<PathBuf>,
        rules: RuleSet,
        monitor: &Monitor,
    ) -> crate::ServerResult<Self> {
        let bucket_dir = bucket_dir.into();
        std::fs::create_dir_all(&bucket_dir)?;

        let mut store =
            ManifestStore::load(bucket_dir.join(beacon_core_manifest::MANIFEST_FILE_NAME));
        store.reconcile(crate::api::bucket_files(&bucket_dir)?, &rules);
        store.save().map_err(|e| {
            crate::ServerError::Bucket(format!("cannot persist manifest: {}", e))
        })?;

        tracing::info!(
            "Bucket initialized: {} ({} manifest entries)",
            bucket_dir.display(),
            store.len()
        );

        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            rules: Arc::new(rules),
            bucket_dir: Arc::new(bucket_dir),
            origins: monitor.origins(),
            health: monitor.health(),
            status: monitor.broadcast(),
        })
    }
}
