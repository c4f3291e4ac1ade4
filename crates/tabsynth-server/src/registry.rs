//! Dataset Registry
//!
//! Maps dataset identity to its stored file and owning user. A row is only
//! valid while its file exists: [`DatasetRegistry::get`] purges rows whose
//! file has disappeared, and [`DatasetRegistry::reconcile`] sweeps every row
//! at startup. A purge removes the synthetic table and plots along with the
//! row, so a reused id starts without artifacts.
//!
//! Identity allocation is `max(id) + 1`. Callers that allocate an id and then
//! register it hold [`DatasetRegistry::lock_writes`] across both steps, which
//! serializes uploads within this process.

use crate::db::{self, datasets::Dataset};
use crate::storage::{ArtifactStore, StorageError};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A dataset is already registered at {0}")]
    DuplicatePath(String),

    /// Missing and foreign datasets are indistinguishable to the caller.
    #[error("Dataset is not accessible")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<db::DbError> for RegistryError {
    fn from(err: db::DbError) -> Self {
        match err {
            db::DbError::Sqlx(e) => RegistryError::Database(e),
            other => RegistryError::Database(sqlx::Error::Protocol(other.to_string())),
        }
    }
}

/// Outcome of a startup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub purged: usize,
}

#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    pool: SqlitePool,
    store: ArtifactStore,
    writes: Arc<Mutex<()>>,
}

impl DatasetRegistry {
    pub fn new(pool: SqlitePool, store: ArtifactStore) -> Self {
        Self {
            pool,
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Serialize id allocation and registration.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// `max(existing ids) + 1`, or 1 for an empty registry.
    pub async fn next_identity(&self) -> RegistryResult<i64> {
        Ok(db::datasets::max_id(&self.pool).await? + 1)
    }

    #[tracing::instrument(skip(self, path))]
    pub async fn register(
        &self,
        id: i64,
        name: &str,
        path: &Path,
        owner_id: i64,
    ) -> RegistryResult<Dataset> {
        let path = path.to_string_lossy();
        if db::datasets::path_exists(&self.pool, &path).await? {
            return Err(RegistryError::DuplicatePath(path.into_owned()));
        }

        match db::datasets::insert(&self.pool, id, name, &path, owner_id).await {
            Ok(dataset) => {
                info!(dataset_id = dataset.id, "Dataset registered");
                Ok(dataset)
            },
            Err(e) if db::is_unique_violation(&e) => {
                Err(RegistryError::DuplicatePath(path.into_owned()))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a dataset. A row whose file is gone is purged and reported as absent.
    pub async fn get(&self, id: i64) -> RegistryResult<Option<Dataset>> {
        let Some(dataset) = db::datasets::find(&self.pool, id).await? else {
            return Ok(None);
        };

        if !Path::new(&dataset.path).is_file() {
            return self.purge_missing(id).await;
        }

        Ok(Some(dataset))
    }

    /// Remove the record, its file, its synthetic table and its plots.
    /// Returns the number of synthetic and plot files removed. Unknown ids
    /// are a no-op.
    ///
    /// Callers hold [`lock_writes`](Self::lock_writes).
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> RegistryResult<usize> {
        let Some(dataset) = db::datasets::find(&self.pool, id).await? else {
            return Ok(0);
        };

        let removed = self.purge(&dataset).await?;
        info!(dataset_id = id, artifacts_removed = removed, "Dataset deleted");
        Ok(removed)
    }

    pub fn assert_ownership(dataset: Option<&Dataset>, owner_id: i64) -> RegistryResult<&Dataset> {
        match dataset {
            Some(dataset) if dataset.owner_id == owner_id => Ok(dataset),
            _ => Err(RegistryError::Forbidden),
        }
    }

    /// [`get`](Self::get) followed by [`assert_ownership`](Self::assert_ownership).
    pub async fn fetch_owned(&self, id: i64, owner_id: i64) -> RegistryResult<Dataset> {
        let dataset = self.get(id).await?;
        Self::assert_ownership(dataset.as_ref(), owner_id).cloned()
    }

    /// The owner's datasets in id order, orphans purged on the way.
    pub async fn list_for_owner(&self, owner_id: i64) -> RegistryResult<Vec<Dataset>> {
        let mut live = Vec::new();
        for dataset in db::datasets::list_by_owner(&self.pool, owner_id).await? {
            if Path::new(&dataset.path).is_file() {
                live.push(dataset);
            } else {
                self.purge_missing(dataset.id).await?;
            }
        }
        Ok(live)
    }

    /// Drop every dataset whose owner no longer exists or whose file is missing.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> RegistryResult<ReconcileSummary> {
        let _guard = self.lock_writes().await;
        let mut summary = ReconcileSummary::default();

        for dataset in db::datasets::list_all(&self.pool).await? {
            summary.checked += 1;
            let owner_exists = db::users::exists(&self.pool, dataset.owner_id).await?;
            let file_exists = Path::new(&dataset.path).is_file();
            if owner_exists && file_exists {
                continue;
            }

            warn!(
                dataset_id = dataset.id,
                owner_id = dataset.owner_id,
                owner_exists,
                file_exists,
                "Purging orphaned dataset"
            );
            self.purge(&dataset).await?;
            summary.purged += 1;
        }

        info!(checked = summary.checked, purged = summary.purged, "Dataset reconciliation finished");
        Ok(summary)
    }

    /// Purge `id` if its file is still missing once the write lock is held.
    /// An upload may have reused the id in the meantime; that row is returned.
    async fn purge_missing(&self, id: i64) -> RegistryResult<Option<Dataset>> {
        let _guard = self.lock_writes().await;
        let Some(dataset) = db::datasets::find(&self.pool, id).await? else {
            return Ok(None);
        };
        if Path::new(&dataset.path).is_file() {
            return Ok(Some(dataset));
        }

        warn!(dataset_id = id, "Dataset file missing, purging orphaned record");
        self.purge(&dataset).await?;
        Ok(None)
    }

    async fn purge(&self, dataset: &Dataset) -> RegistryResult<usize> {
        db::datasets::delete(&self.pool, dataset.id).await?;
        remove_if_present(Path::new(&dataset.path)).await?;
        Ok(self.store.remove_artifacts(dataset.id, &dataset.name).await?)
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
