use fs2::FileExt;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::lifecycle;
use crate::models::{Request, COLUMNS};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handles saving and loading requests from a CSV file, with a lock file
/// serializing writers across processes
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
    lock_timeout: Option<Duration>,
}

impl Storage {
    /// Creates a new Storage instance; lock acquisition blocks until available
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let mut lock_file_path = file_path.clone().into_os_string();
        lock_file_path.push(".lock");
        Self {
            file_path,
            lock_file_path: PathBuf::from(lock_file_path),
            lock_timeout: None,
        }
    }

    /// Gives up waiting for the lock after `timeout` instead of blocking
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Returns the path to the sentinel lock file
    pub fn lock_path(&self) -> &Path {
        &self.lock_file_path
    }

    fn ensure_parent_dir(&self) -> StoreResult<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::unavailable(parent, e))?;
            }
        }
        Ok(())
    }

    /// Acquire an exclusive lock on the sentinel file
    /// Returns the lock file handle; the lock is released when it is dropped
    fn acquire_write_lock(&self) -> StoreResult<File> {
        self.ensure_parent_dir()?;

        let mut lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_file_path)
            .map_err(|e| StoreError::unavailable(&self.lock_file_path, e))?;

        match self.lock_timeout {
            None => lock_file
                .lock_exclusive()
                .map_err(|e| StoreError::unavailable(&self.lock_file_path, e))?,
            Some(timeout) => {
                let start = Instant::now();
                let mut contended = false;
                loop {
                    match lock_file.try_lock_exclusive() {
                        Ok(()) => break,
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            if !contended {
                                warn!("Waiting for lock on {:?}", self.lock_file_path);
                                contended = true;
                            }
                            if start.elapsed() > timeout {
                                return Err(StoreError::unavailable(
                                    &self.file_path,
                                    "timeout waiting for file lock - another user may be saving",
                                ));
                            }
                            std::thread::sleep(LOCK_POLL_INTERVAL);
                        }
                        Err(e) => return Err(StoreError::unavailable(&self.lock_file_path, e)),
                    }
                }
            }
        }

        // Lock holder info, for debugging only
        let stamp = lock_file.set_len(0).and_then(|()| {
            writeln!(
                lock_file,
                "Locked by PID {} at {}",
                std::process::id(),
                chrono::Utc::now().to_rfc3339()
            )
        });
        if let Err(e) = stamp {
            debug!("Could not record lock holder in {:?}: {}", self.lock_file_path, e);
        }
        debug!("Acquired lock {:?}", self.lock_file_path);

        Ok(lock_file)
    }

    /// Loads every request, creating a header-only file if none exists yet
    pub fn load(&self) -> StoreResult<Vec<Request>> {
        if !self.file_path.exists() {
            let _lock = self.acquire_write_lock()?;
            // Another writer may have created it while we waited
            if !self.file_path.exists() {
                debug!("Initializing {:?}", self.file_path);
                self.write_records(&[])?;
            }
        }
        self.read_records()
    }

    /// Appends one request under the lock
    pub fn append(&self, request: Request) -> StoreResult<()> {
        self.update_atomically(|requests| lifecycle::push_unique(requests, request))
    }

    /// Replaces the whole file with `requests` under the lock
    pub fn save(&self, requests: &[Request]) -> StoreResult<()> {
        let _lock = self.acquire_write_lock()?;
        self.write_records(requests)
    }

    /// Reloads the file, applies `update_fn` and saves, all while holding the
    /// lock. Nothing is written if `update_fn` fails.
    pub fn update_atomically<T, F>(&self, update_fn: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Vec<Request>) -> StoreResult<T>,
    {
        let _lock = self.acquire_write_lock()?;

        let mut requests = if self.file_path.exists() {
            self.read_records()?
        } else {
            Vec::new()
        };

        let result = update_fn(&mut requests)?;
        self.write_records(&requests)?;

        // Lock is released when _lock is dropped
        Ok(result)
    }

    fn read_records(&self) -> StoreResult<Vec<Request>> {
        let file =
            File::open(&self.file_path).map_err(|e| StoreError::unavailable(&self.file_path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .map_err(|e| StoreError::corrupt(&self.file_path, e))?
            .clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            return Err(StoreError::corrupt(
                &self.file_path,
                format!(
                    "unexpected header row [{}], expected [{}]",
                    headers.iter().collect::<Vec<_>>().join(", "),
                    COLUMNS.join(", ")
                ),
            ));
        }

        reader
            .deserialize::<Request>()
            .map(|row| row.map_err(|e| StoreError::corrupt(&self.file_path, e)))
            .collect()
    }

    /// Writes to a temp file next to the target and renames it into place,
    /// so readers never see a half-written file
    fn write_records(&self, requests: &[Request]) -> StoreResult<()> {
        self.ensure_parent_dir()?;
        let dir = match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::unavailable(dir, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp);

        let unavailable = |e: csv::Error| StoreError::unavailable(&self.file_path, e);
        writer.write_record(COLUMNS).map_err(unavailable)?;
        for request in requests {
            writer.serialize(request).map_err(unavailable)?;
        }

        let tmp = writer
            .into_inner()
            .map_err(|e| StoreError::unavailable(&self.file_path, e.error()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::unavailable(&self.file_path, e))?;
        tmp.persist(&self.file_path)
            .map_err(|e| StoreError::unavailable(&self.file_path, e.error))?;

        debug!("Wrote {} request(s) to {:?}", requests.len(), self.file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRequest;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn request(id: &str, name: &str, amount: Decimal) -> Request {
        Request::new(id.to_string(), NewRequest::new(name, "Travel", amount), Utc::now())
    }

    #[test]
    fn test_load_creates_header_only_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("database.csv");
        let storage = Storage::new(&path);

        let requests = storage.load().unwrap();
        assert!(requests.is_empty());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_lock_file_names_holder() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("database.csv"));
        storage.save(&[]).unwrap();

        let stamp = fs::read_to_string(storage.lock_path()).unwrap();
        assert!(stamp.starts_with(&format!("Locked by PID {} at ", std::process::id())));
        assert_eq!(stamp.lines().count(), 1);
    }

    #[test]
    fn test_lock_path_is_sidecar() {
        let storage = Storage::new("/tmp/data/database.csv");
        assert_eq!(storage.lock_path(), Path::new("/tmp/data/database.csv.lock"));
    }

    #[test]
    fn test_append_then_load_preserves_prior_rows() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("database.csv"));

        let first = request("REQ-001", "Alice", Decimal::new(12050, 2));
        let second = request("REQ-002", "Bob, Jr.", Decimal::new(30, 0));
        storage.append(first.clone()).unwrap();
        storage.append(second.clone()).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_optional_columns_round_trip_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.csv");
        let storage = Storage::new(&path);

        let mut req = request("REQ-001", "Alice", Decimal::new(12050, 2));
        req.liquidated_invoices = "receipts/a.pdf\nreceipts/b.pdf".to_string();
        storage.save(&[req.clone()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(",120.50,Pending,Pending,,,,"));
        assert_eq!(storage.load().unwrap(), vec![req]);
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("database.csv"));
        storage
            .append(request("REQ-001", "Alice", Decimal::ONE))
            .unwrap();

        let result = storage.append(request("REQ-001", "Bob", Decimal::ONE));
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(storage.load().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.csv");
        let storage = Storage::new(&path);
        storage
            .append(request("REQ-001", "Alice", Decimal::ONE))
            .unwrap();
        let before = fs::read(&path).unwrap();

        let result: StoreResult<()> = storage.update_atomically(|requests| {
            requests.clear();
            Err(StoreError::NotFound("REQ-404".to_string()))
        });

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_foreign_header_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.csv");
        fs::write(&path, "id,name\n1,Alice\n").unwrap();

        let storage = Storage::new(&path);
        assert!(matches!(storage.load(), Err(StoreError::CorruptData { .. })));
    }

    #[test]
    fn test_lock_timeout_reports_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.csv");
        let storage =
            Storage::new(&path).with_lock_timeout(Some(Duration::from_millis(200)));
        storage.load().unwrap();

        let holder = OpenOptions::new()
            .write(true)
            .open(storage.lock_path())
            .unwrap();
        holder.lock_exclusive().unwrap();

        let result = storage.save(&[]);
        assert!(matches!(result, Err(StoreError::StorageUnavailable { .. })));

        holder.unlock().unwrap();
        assert!(storage.save(&[]).is_ok());
    }
}
