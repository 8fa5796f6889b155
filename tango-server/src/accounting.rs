//! Per-shard accounting: an append-only CSV of completed work, uploaded and
//! truncated once a job finishes (spec.md §4.D step 6-7).
//!
//! Record format — `"<device_id>,<consumer_id>,<flops>\n"` — follows
//! `examples/original_source/src/records.go::AppendRecord` exactly; this is
//! wire-format-equivalent data other tooling may already parse.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Guards the accounting file against concurrent appends from multiple
/// in-flight `ReportResult` calls — there is exactly one file, so one lock.
pub struct AccountingLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl AccountingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Append one record. Called after a shard's result is stored but
    /// without holding the job lock, per spec.md §5's "no I/O under a job
    /// lock" rule.
    pub fn append(&self, device_id: &str, consumer_id: &str, flops: i64) -> std::io::Result<()> {
        use std::io::Write;
        let _held = self.guard.lock().unwrap();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{device_id},{consumer_id},{flops}")
    }

    /// Read the full accounting file and truncate it to empty, atomically
    /// with respect to concurrent `append` calls. Returns the bytes to hand
    /// to the object store; an empty file yields an empty vec.
    pub fn take_and_clear(&self) -> std::io::Result<Vec<u8>> {
        let _held = self.guard.lock().unwrap();
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        std::fs::File::create(&self.path)?;
        Ok(bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
