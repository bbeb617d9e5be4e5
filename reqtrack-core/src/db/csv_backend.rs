//! CSV file storage backend
//!
//! This backend keeps the whole dataset in one CSV file, using the
//! Storage implementation with file locking support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::traits::{BackendType, RequestBackend};
use crate::error::StoreResult;
use crate::models::Request;
use crate::storage::Storage;

/// CSV file backend implementation
pub struct CsvBackend {
    storage: Storage,
    path: PathBuf,
}

impl CsvBackend {
    /// Creates a new CSV backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Stops waiting for the lock after `timeout`
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.storage = self.storage.with_lock_timeout(timeout);
        self
    }
}

impl RequestBackend for CsvBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Csv
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<Vec<Request>> {
        self.storage.load()
    }

    fn append(&self, request: Request) -> StoreResult<()> {
        self.storage.append(request)
    }

    fn overwrite(&self, requests: &[Request]) -> StoreResult<()> {
        self.storage.save(requests)
    }

    fn update_atomically(
        &self,
        update_fn: &mut dyn FnMut(&mut Vec<Request>) -> StoreResult<()>,
    ) -> StoreResult<()> {
        self.storage.update_atomically(update_fn)
    }
}
