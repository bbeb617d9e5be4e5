//! Storage abstraction layer for request tracking
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing the lifecycle operations to run against the CSV file or an
//! in-memory store through the same interface.

mod csv_backend;
mod memory_backend;
mod traits;

pub use csv_backend::CsvBackend;
pub use memory_backend::MemoryBackend;
pub use traits::{BackendType, RequestBackend, StoreConfig};

use crate::error::StoreResult;

/// Creates a storage backend from its configuration
///
/// The memory backend starts from the rows in `config.path` when that file
/// exists, and never writes back to it.
pub fn create_backend(config: &StoreConfig) -> StoreResult<Box<dyn RequestBackend>> {
    let backend: Box<dyn RequestBackend> = match config.backend_type {
        BackendType::Csv => {
            Box::new(CsvBackend::new(&config.path).with_lock_timeout(config.lock_timeout))
        }
        BackendType::Memory => {
            let requests = if config.path.exists() {
                CsvBackend::new(&config.path)
                    .with_lock_timeout(config.lock_timeout)
                    .read_all()?
            } else {
                Vec::new()
            };
            Box::new(MemoryBackend::with_requests(requests))
        }
    };
    Ok(backend)
}
