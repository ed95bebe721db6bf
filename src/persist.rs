//! Whole-collection snapshot persistence.
//!
//! Every store in this crate keeps its full collection in memory and
//! rewrites the complete snapshot on each mutation. The [`SnapshotStore`]
//! trait is the seam between a store and its backing medium; callers never
//! see which implementation sits behind it.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedRwLockWriteGuard;
use tracing::debug;

/// Errors raised while loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be read, written, synced, or renamed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The collection could not be encoded.
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    /// The persisted snapshot is not a valid collection.
    #[error("snapshot at {path} is corrupt: {source}")]
    Decode {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Backend-specific failure not tied to a file.
    #[error("snapshot backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable medium for a complete, ordered collection of `T`.
///
/// `save` must not return `Ok` until the snapshot is on stable storage.
#[async_trait]
pub trait SnapshotStore<T>: Send + Sync {
    /// Load the last persisted collection. An absent snapshot is empty.
    async fn load(&self) -> Result<Vec<T>, StorageError>;

    /// Replace the persisted collection with `items`.
    async fn save(&self, items: &[T]) -> Result<(), StorageError>;
}

/// Save `next` and then publish it through `guard`, on a task of its own.
///
/// The save and the in-memory commit run to completion together even if
/// the caller stops waiting, so memory never falls behind disk. The guard
/// is released only after the commit.
///
/// # Errors
///
/// Returns the save error, leaving the guarded collection untouched, or
/// [`StorageError::Unavailable`] if the commit task panicked.
pub async fn save_then_commit<T>(
    mut guard: OwnedRwLockWriteGuard<Vec<T>>,
    next: Vec<T>,
    snapshot: Arc<dyn SnapshotStore<T>>,
) -> Result<(), StorageError>
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        snapshot.save(&next).await?;
        *guard = next;
        Ok::<(), StorageError>(())
    })
    .await
    .map_err(|e| StorageError::Unavailable(format!("commit task failed: {e}")))?
}

/// Pretty-printed JSON array on the local filesystem.
///
/// Saves go through a sibling `.tmp` file that is fsynced and then renamed
/// over the target, so readers only ever see a complete snapshot.
pub struct JsonFileSnapshot<T> {
    path: PathBuf,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonFileSnapshot<T> {
    /// Snapshot backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _item: PhantomData,
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl<T> SnapshotStore<T> for JsonFileSnapshot<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Vec<T>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, items: &[T]) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec_pretty(items).map_err(StorageError::Encode)?;
        let tmp_path = self.tmp_path();

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(io_error(&tmp_path))?;
        file.write_all(&encoded)
            .await
            .map_err(io_error(&tmp_path))?;
        file.sync_all().await.map_err(io_error(&tmp_path))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        debug!(path = %self.path.display(), items = items.len(), "snapshot saved");
        Ok(())
    }
}
