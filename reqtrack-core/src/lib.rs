pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use config::{determine_database_path, get_config_path, Config};
pub use db::{create_backend, BackendType, CsvBackend, MemoryBackend, RequestBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use export::Summary;
pub use ids::next_reference_id;
pub use lifecycle::RequestFilter;
pub use models::{FinanceStatus, NewRequest, Request, RequestField, RequestStatus, COLUMNS};
pub use storage::Storage;
