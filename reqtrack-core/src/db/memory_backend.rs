//! In-memory storage backend
//!
//! Holds the dataset in a mutex. Used for tests and dry runs; nothing is
//! persisted.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::{BackendType, RequestBackend};
use crate::error::{StoreError, StoreResult};
use crate::lifecycle;
use crate::models::Request;

#[derive(Default)]
pub struct MemoryBackend {
    requests: Mutex<Vec<Request>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing dataset
    pub fn with_requests(requests: Vec<Request>) -> Self {
        Self {
            requests: Mutex::new(requests),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Vec<Request>>> {
        self.requests.lock().map_err(|_| StoreError::StorageUnavailable {
            path: self.path().to_path_buf(),
            message: "in-memory store poisoned by a panicked writer".to_string(),
        })
    }
}

impl RequestBackend for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn path(&self) -> &Path {
        Path::new(":memory:")
    }

    fn read_all(&self) -> StoreResult<Vec<Request>> {
        Ok(self.lock()?.clone())
    }

    fn append(&self, request: Request) -> StoreResult<()> {
        let mut guard = self.lock()?;
        lifecycle::push_unique(&mut guard, request)
    }

    fn overwrite(&self, requests: &[Request]) -> StoreResult<()> {
        *self.lock()? = requests.to_vec();
        Ok(())
    }

    fn update_atomically(
        &self,
        update_fn: &mut dyn FnMut(&mut Vec<Request>) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        update_fn(&mut working)?;
        *guard = working;
        Ok(())
    }
}
