//! Artifact Store
//!
//! Reads and writes real tables, synthetic tables and plots at the paths
//! [`ArtifactLayout`] derives from a dataset id. Table reads and writes are
//! synchronous and meant to run on the blocking pool next to the engine; the
//! byte-level helpers used directly by handlers are async.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tabsynth_common::{ArtifactLayout, Table, TabSynthError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found")]
    NotFound,

    #[error("Invalid plot file name: {0}")]
    InvalidPlotName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table error: {0}")]
    Table(TabSynthError),
}

impl From<TabSynthError> for StorageError {
    fn from(err: TabSynthError) -> Self {
        match err {
            TabSynthError::Io(e) => Self::from(e),
            other => StorageError::Table(other),
        }
    }
}

fn not_found_aware(err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: ArtifactLayout,
}

impl ArtifactStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Create the dataset, synthetic and plot directories.
    pub fn ensure_layout(&self) -> StorageResult<()> {
        self.layout.ensure_dirs()?;
        info!(
            dataset_root = %self.layout.dataset_root.display(),
            synthetic_root = %self.layout.synthetic_root.display(),
            plot_root = %self.layout.plot_root.display(),
            "Artifact directories ready"
        );
        Ok(())
    }

    /// Persist uploaded bytes as the real table of dataset `id`.
    pub async fn save_upload(&self, id: i64, name: &str, content: &[u8]) -> StorageResult<PathBuf> {
        let path = self.layout.real_table(id, name);
        tokio::fs::write(&path, content).await?;
        debug!(dataset_id = id, bytes = content.len(), "Upload stored");
        Ok(path)
    }

    pub fn read_real(&self, path: &Path) -> StorageResult<Table> {
        match Table::from_path(path) {
            Ok(table) => Ok(table),
            Err(TabSynthError::Io(e)) => Err(not_found_aware(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the synthetic table for `id`, replacing any previous one.
    pub fn write_synthetic(&self, id: i64, name: &str, table: &Table) -> StorageResult<PathBuf> {
        let path = self.layout.synthetic_table(id, name);
        let staging = path.with_extension("tmp");
        table.write_path(&staging)?;
        std::fs::rename(&staging, &path)?;
        debug!(dataset_id = id, rows = table.len(), "Synthetic table written");
        Ok(path)
    }

    pub fn read_synthetic(&self, id: i64, name: &str) -> StorageResult<Table> {
        match Table::from_path(self.layout.synthetic_table(id, name)) {
            Ok(table) => Ok(table),
            Err(TabSynthError::Io(e)) => Err(not_found_aware(e)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn synthetic_exists(&self, id: i64, name: &str) -> bool {
        self.layout.synthetic_table(id, name).is_file()
    }

    pub async fn synthetic_bytes(&self, id: i64, name: &str) -> StorageResult<Vec<u8>> {
        tokio::fs::read(self.layout.synthetic_table(id, name))
            .await
            .map_err(not_found_aware)
    }

    /// Bytes of a rendered plot of dataset `id`.
    ///
    /// `file` must be a bare `.png` file name starting with the id, so one
    /// dataset's URL can never reach another dataset's plots or leave the plot
    /// directory.
    pub async fn read_plot(&self, id: i64, file: &str) -> StorageResult<Vec<u8>> {
        if !is_plot_of(id, file) {
            return Err(StorageError::InvalidPlotName(file.to_string()));
        }
        tokio::fs::read(self.layout.plot_path(file))
            .await
            .map_err(not_found_aware)
    }

    /// Remove the synthetic table and every plot of dataset `id`. Missing
    /// files are skipped.
    ///
    /// Plots are found by listing the plot directory, so nothing is left
    /// behind when the real table (and with it the header) is already gone.
    pub async fn remove_artifacts(&self, id: i64, name: &str) -> StorageResult<usize> {
        let mut targets = vec![self.layout.synthetic_table(id, name)];

        match tokio::fs::read_dir(&self.layout.plot_root).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let file_name = entry.file_name();
                    if file_name.to_str().is_some_and(|file| is_plot_of(id, file)) {
                        targets.push(entry.path());
                    }
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => return Err(e.into()),
        }

        let mut removed = 0;
        for path in targets {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => return Err(e.into()),
            }
        }
        debug!(dataset_id = id, removed, "Artifacts removed");
        Ok(removed)
    }
}

fn is_plot_of(id: i64, file: &str) -> bool {
    let prefix = id.to_string();
    let Some(rest) = file.strip_prefix(&prefix) else {
        return false;
    };
    // "12x.png" must not match dataset 1
    let next_is_digit = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
    !next_is_digit
        && file.ends_with(".png")
        && file.len() > prefix.len() + ".png".len()
        && !file.contains(['/', '\\'])
        && !file.contains("..")
}
