//! Publishes the carpark snapshot as a JSON document on disk.
//!
//! Writes go to a uniquely named staging file in the same directory and are
//! renamed over the published file, so readers never observe a partial
//! document.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::CarparkFeature;
use crate::domain::ports::{SnapshotStore, SnapshotStoreError};

/// File name of the published snapshot inside the output directory.
pub const SNAPSHOT_FILENAME: &str = "carparks.json";

fn io_error(path: &Path, error: io::Error) -> SnapshotStoreError {
    SnapshotStoreError::io(format!("{}: {error}", path.display()))
}

/// Snapshot store backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    directory: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Location of the published document.
    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(SNAPSHOT_FILENAME)
    }

    fn open_directory(&self) -> Result<Dir, SnapshotStoreError> {
        Dir::create_ambient_dir_all(&self.directory, ambient_authority())
            .map_err(|error| io_error(&self.directory, error))?;
        Dir::open_ambient_dir(&self.directory, ambient_authority())
            .map_err(|error| io_error(&self.directory, error))
    }

    fn write_atomically(&self, payload: &[u8]) -> Result<(), SnapshotStoreError> {
        let directory = self.open_directory()?;
        let staging = format!(".{SNAPSHOT_FILENAME}.{}.tmp", Uuid::new_v4().simple());
        let staging_path = self.directory.join(&staging);

        let result = (|| {
            let mut file = directory
                .create(&staging)
                .map_err(|error| io_error(&staging_path, error))?;
            file.write_all(payload)
                .and_then(|()| file.sync_all())
                .map_err(|error| io_error(&staging_path, error))?;
            directory
                .rename(&staging, &directory, SNAPSHOT_FILENAME)
                .map_err(|error| io_error(&self.snapshot_path(), error))
        })();

        if result.is_err() {
            let _cleanup = directory.remove_file(&staging);
        }
        result
    }

    fn read_blocking(&self) -> Result<Option<Vec<u8>>, SnapshotStoreError> {
        let directory = match Dir::open_ambient_dir(&self.directory, ambient_authority()) {
            Ok(directory) => directory,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&self.directory, error)),
        };
        match directory.read(SNAPSHOT_FILENAME) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(&self.snapshot_path(), error)),
        }
    }
}

async fn blocking<T, F>(task: F) -> Result<T, SnapshotStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SnapshotStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| SnapshotStoreError::io(format!("snapshot task failed: {error}")))?
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn publish(&self, features: &[CarparkFeature]) -> Result<(), SnapshotStoreError> {
        let payload = serde_json::to_vec(features)
            .map_err(|error| SnapshotStoreError::encode(error.to_string()))?;
        let bytes = payload.len();
        let store = self.clone();
        blocking(move || store.write_atomically(&payload)).await?;
        debug!(
            path = %self.snapshot_path().display(),
            features = features.len(),
            bytes,
            "snapshot published"
        );
        Ok(())
    }

    async fn read_latest(&self) -> Result<Option<Vec<CarparkFeature>>, SnapshotStoreError> {
        let store = self.clone();
        let Some(bytes) = blocking(move || store.read_blocking()).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|error| SnapshotStoreError::decode(error.to_string()))
    }
}
