//! Async wrapper around ReadingsDb that uses tokio::task::spawn_blocking
//!
//! SQLite calls are blocking; running them on the blocking pool keeps the
//! collection cycle from stalling the runtime's worker threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{ElecRow, GroundpipeRow, HeatpumpRow, ReadingsDb, StoreError};

/// Async wrapper around ReadingsDb
///
/// The connection is shared behind an `Arc<Mutex<>>`, so clones of this
/// handle all write through the same SQLite connection.
#[derive(Clone)]
pub struct AsyncReadingsDb {
    path: PathBuf,
    inner: Arc<Mutex<ReadingsDb>>,
}

impl AsyncReadingsDb {
    /// Open (and create if needed) the database at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let path_clone = path.clone();

        let db = tokio::task::spawn_blocking(move || ReadingsDb::open(path_clone))
            .await
            .map_err(join_error)??;

        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(db)),
        })
    }

    pub fn from_db(db: ReadingsDb) -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            inner: Arc::new(Mutex::new(db)),
        }
    }

    pub async fn insert_heatpump(&self, row: HeatpumpRow) -> Result<(), StoreError> {
        self.run(move |db| db.insert_heatpump(&row)).await
    }

    pub async fn insert_groundpipe(&self, row: GroundpipeRow) -> Result<(), StoreError> {
        self.run(move |db| db.insert_groundpipe(&row)).await
    }

    pub async fn insert_elec(&self, row: ElecRow) -> Result<(), StoreError> {
        self.run(move |db| db.insert_elec(&row)).await
    }

    pub async fn latest_heatpump(&self, device_id: &str) -> Result<Option<HeatpumpRow>, StoreError> {
        let device_id = device_id.to_string();
        self.run(move |db| db.latest_heatpump(&device_id)).await
    }

    pub async fn latest_groundpipe(
        &self,
        device_id: &str,
    ) -> Result<Option<GroundpipeRow>, StoreError> {
        let device_id = device_id.to_string();
        self.run(move |db| db.latest_groundpipe(&device_id)).await
    }

    pub async fn latest_elec(&self, device_id: &str) -> Result<Option<ElecRow>, StoreError> {
        let device_id = device_id.to_string();
        self.run(move |db| db.latest_elec(&device_id)).await
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&ReadingsDb) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let db = inner.blocking_lock();
            f(&db)
        })
        .await
        .map_err(join_error)?
    }
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::IOError(std::io::Error::other(format!(
        "Failed to spawn blocking task: {}",
        e
    )))
}
