//! JSONL file writer for dispatch audit records.
//!
//! Each [`AuditRecord`] is serialized as a single JSON line with a
//! `timestamp` field, appended to the file via a buffered writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use toolgate_application::ports::audit_log::{AuditLog, AuditRecord};
use tracing::warn;

/// JSONL audit log that appends one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlAuditLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Open the log for appending.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create audit log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open audit log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    fn record(&self, record: AuditRecord) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let Ok(Value::Object(mut map)) = serde_json::to_value(&record) else {
            return;
        };
        map.insert("timestamp".to_string(), Value::String(timestamp));

        let Ok(line) = serde_json::to_string(&map) else {
            return;
        };

        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", line);
        // Flush per record so a crash never loses a completed call.
        let _ = writer.flush();
    }
}

impl Drop for JsonlAuditLog {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}
