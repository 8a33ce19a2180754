use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub const DEFAULT_ERROR_LOG: &str = ".terminusdb_error_log";

const ENTRY_END: &str = "===================";

/// What kind of insert an error log entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    Schema,
    Document,
}

impl std::fmt::Display for InsertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertKind::Schema => f.write_str("Schema"),
            InsertKind::Document => f.write_str("Document"),
        }
    }
}

/// Append-only log of payloads dropped after a failed insert.
///
/// The file is opened, appended and closed for every entry; nothing is
/// held open between failures. The engine never reads it back.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG)
    }
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, kind: InsertKind, error: &dyn std::fmt::Display, payload: &Value) -> std::io::Result<()> {
        let mut f = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        let payload = serde_json::to_string(payload).map_err(std::io::Error::other)?;
        write!(f, "\n{kind} insert error:\n{error}\nwhile inserting:\n{payload}\n{ENTRY_END}\n")?;
        f.flush()
    }

    /// Like `append`, but a failure to write is only reported.
    pub fn record(&self, kind: InsertKind, error: &dyn std::fmt::Display, payload: &Value) {
        if let Err(e) = self.append(kind, error, payload) {
            tracing::error!(path = %self.path.display(), error = %e, "cannot write error log");
        }
    }
}
