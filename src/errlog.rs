//! Append-only infrastructure error log.
//!
//! Records failures of the judge itself (spawn failures, status-store
//! trouble) durably and separately from submission verdicts, so operators
//! can reconcile submissions whose verdict never made it to the store.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::error;

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one line describing an infrastructure failure. If the log
    /// itself cannot be written there is nothing left to fall back to but
    /// the process log.
    pub fn append(&self, context: &str, detail: impl Display) {
        error!("{}: {}", context, detail);

        let entry = format!("{}: {}\n", context, detail);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));

        if let Err(e) = result {
            error!("failed to append to error log {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("system_error.log"));

        log.append("spawn failed", "No such file or directory");
        log.append("verdict write failed for submission 7", "connection refused");

        let content = std::fs::read_to_string(dir.path().join("system_error.log")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("spawn failed:"));
        assert!(lines[1].contains("submission 7"));
    }
}
