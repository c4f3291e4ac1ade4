//! Application context
//!
//! Built once at startup and handed to every route as axum state. Holds the
//! pool, the registry, the artifact store, the engine and the worker permits
//! that bound concurrent synthesis and evaluation.

use crate::config::Config;
use crate::db;
use crate::registry::DatasetRegistry;
use crate::storage::ArtifactStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tabsynth_engine::synthesis::EmpiricalBackend;
use tabsynth_engine::Engine;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinError;
use tracing::info;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker pool is closed")]
    Closed(#[from] AcquireError),

    #[error("Worker task failed: {0}")]
    Join(#[from] JoinError),
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: SqlitePool,
    pub registry: DatasetRegistry,
    pub storage: ArtifactStore,
    pub engine: Engine,
    workers: Arc<Semaphore>,
}

impl AppContext {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let engine = Engine::with_backend(EmpiricalBackend::new(config.synthesis.sampler_seed));
        let storage = ArtifactStore::new(config.storage.layout());
        Self {
            registry: DatasetRegistry::new(db.clone(), storage.clone()),
            storage,
            workers: Arc::new(Semaphore::new(config.synthesis.workers)),
            engine,
            db,
            config: Arc::new(config),
        }
    }

    /// Connect, migrate, prepare directories and sweep orphaned datasets.
    pub async fn initialize(config: Config) -> anyhow::Result<Self> {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;

        let ctx = Self::new(config, pool);
        ctx.storage.ensure_layout()?;

        let summary = ctx.registry.reconcile().await?;
        info!(
            checked = summary.checked,
            purged = summary.purged,
            "Startup reconciliation complete"
        );

        Ok(ctx)
    }

    /// Run CPU-bound work on the blocking pool once a worker permit is free.
    pub async fn run_blocking<F, T>(&self, work: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.workers.clone().acquire_owned().await?;
        let output = tokio::task::spawn_blocking(work).await?;
        Ok(output)
    }

    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("available_workers", &self.available_workers())
            .finish_non_exhaustive()
    }
}
