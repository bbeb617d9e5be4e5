//! Storage port
//!
//! This module defines the trait every request store implements. The
//! lifecycle operations are provided on top of it, so they work the same for
//! the CSV file and the in-memory store.

use chrono::{NaiveDate, Utc};
use log::info;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::export::Summary;
use crate::ids;
use crate::lifecycle::{self, RequestFilter};
use crate::models::{FinanceStatus, NewRequest, Request, RequestStatus};

/// Types of storage backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Local CSV file guarded by a lock file
    Csv,
    /// Process-local, nothing persisted
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Csv => write!(f, "CSV"),
            BackendType::Memory => write!(f, "Memory"),
        }
    }
}

/// Settings used to open a backend
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the data file
    pub path: std::path::PathBuf,
    /// Backend type
    pub backend_type: BackendType,
    /// How long a writer waits for the lock; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("database.csv"),
            backend_type: BackendType::Csv,
            lock_timeout: None,
        }
    }
}

/// Core trait for request stores
///
/// Implementors provide whole-dataset reads and writes plus a locked
/// read-modify-write. Lookups and lifecycle updates are default methods
/// built on those, and every update goes through `update_atomically`.
pub trait RequestBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the data file
    fn path(&self) -> &Path;

    // =========================================================================
    // Whole Dataset Operations
    // =========================================================================

    /// Loads every request, initializing empty storage if needed
    fn read_all(&self) -> StoreResult<Vec<Request>>;

    /// Adds one row at the end of the dataset
    fn append(&self, request: Request) -> StoreResult<()>;

    /// Replaces the whole dataset
    fn overwrite(&self, requests: &[Request]) -> StoreResult<()>;

    /// Reads, applies `update_fn` and writes back as one critical section.
    /// Nothing is written if `update_fn` fails.
    fn update_atomically(
        &self,
        update_fn: &mut dyn FnMut(&mut Vec<Request>) -> StoreResult<()>,
    ) -> StoreResult<()>;

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Reference ID the next submission would receive
    fn next_reference_id(&self) -> StoreResult<String> {
        ids::next_reference_id(&self.read_all()?)
    }

    /// Gets a request by its reference ID (e.g., "REQ-001")
    fn get_request(&self, reference_id: &str) -> StoreResult<Request> {
        let requests = self.read_all()?;
        lifecycle::find(&requests, reference_id).cloned()
    }

    /// Lists requests matching `filter`, in submission order
    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<Request>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    /// Totals across the whole dataset
    fn summary(&self) -> StoreResult<Summary> {
        Ok(Summary::from_requests(&self.read_all()?))
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Validates and stores a new request
    /// Returns the stored row with its assigned reference ID
    fn submit(&self, submission: NewRequest) -> StoreResult<Request> {
        // Reject bad input before taking the lock
        submission.validate()?;
        let request = update_returning(self, |requests| {
            lifecycle::submit(requests, submission.clone(), Utc::now())
        })?;
        info!(
            "Submitted {} for {} ({})",
            request.reference_id, request.requester_name, request.amount_requested
        );
        Ok(request)
    }

    /// Sets the approval status
    fn update_status(&self, reference_id: &str, status: RequestStatus) -> StoreResult<Request> {
        let request = update_returning(self, |requests| {
            lifecycle::set_status(requests, reference_id, status)
        })?;
        info!("{} status -> {}", request.reference_id, status);
        Ok(request)
    }

    /// Sets the finance status together with the issue date
    fn update_finance_status(
        &self,
        reference_id: &str,
        finance_status: FinanceStatus,
        issue_date: Option<NaiveDate>,
    ) -> StoreResult<Request> {
        let request = update_returning(self, |requests| {
            lifecycle::set_finance_status(requests, reference_id, finance_status, issue_date)
        })?;
        info!("{} finance status -> {}", request.reference_id, finance_status);
        Ok(request)
    }

    /// Records how much was spent and returned, with the invoice reference
    fn update_liquidation(
        &self,
        reference_id: &str,
        liquidated: Decimal,
        returned: Decimal,
        invoices: &str,
    ) -> StoreResult<Request> {
        let request = update_returning(self, |requests| {
            lifecycle::set_liquidation(requests, reference_id, liquidated, returned, invoices)
        })?;
        info!(
            "{} liquidated {} / returned {}",
            request.reference_id, liquidated, returned
        );
        Ok(request)
    }

    /// Applies a column → value mapping to one request
    fn edit_request(
        &self,
        reference_id: &str,
        changes: &BTreeMap<String, String>,
    ) -> StoreResult<Request> {
        let request = update_returning(self, |requests| {
            lifecycle::apply_edit(requests, reference_id, changes)
        })?;
        info!(
            "{} edited: {}",
            request.reference_id,
            changes.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(request)
    }
}

/// Runs a single-request update and hands back the row it produced
fn update_returning<B, F>(backend: &B, mut update_fn: F) -> StoreResult<Request>
where
    B: RequestBackend + ?Sized,
    F: FnMut(&mut Vec<Request>) -> StoreResult<Request>,
{
    let mut updated = None;
    backend.update_atomically(&mut |requests| {
        updated = Some(update_fn(requests)?);
        Ok(())
    })?;
    updated.ok_or_else(|| StoreError::StorageUnavailable {
        path: backend.path().to_path_buf(),
        message: "update was not applied".to_string(),
    })
}
