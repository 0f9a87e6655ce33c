use std::sync::Arc;

use italo_core::time::Clock;
use storage::repository::Storage;

use crate::discovery::DiscoveryService;
use crate::error::AppServicesError;
use crate::progress::ProgressService;
use crate::session::SessionService;
use crate::stats::StatsService;

/// Composition root: wires every service over one injected storage
/// aggregate.
#[derive(Clone)]
pub struct AppServices {
    discovery: Arc<DiscoveryService>,
    progress: Arc<ProgressService>,
    stats: Arc<StatsService>,
    sessions: Arc<SessionService>,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));
        let discovery = Arc::new(DiscoveryService::new(
            Arc::clone(&storage.content),
            Arc::clone(&storage.progress),
            storage.watch.clone(),
        ));
        let stats = Arc::new(StatsService::new(
            Arc::clone(&storage.content),
            Arc::clone(&storage.progress),
        ));
        let sessions = Arc::new(SessionService::new(
            Arc::clone(&storage.content),
            Arc::clone(&progress),
        ));
        Self {
            discovery,
            progress,
            stats,
            sessions,
        }
    }

    /// Services over the in-memory backend, mainly for tests and demos.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, &Storage::in_memory())
    }

    /// Services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(clock, &storage))
    }

    #[must_use]
    pub fn discovery(&self) -> Arc<DiscoveryService> {
        Arc::clone(&self.discovery)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }
}
