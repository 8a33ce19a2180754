pub mod error;

use std::future::Future;
use std::pin::Pin;

pub use error::{DatabaseError, ErrorKind};

// ════════════════════════════════════════════════════════════════
//  Document Store
// ════════════════════════════════════════════════════════════════

/// Commit message for class definition inserts.
pub const SCHEMA_COMMIT_MSG: &str = "Schema objects insert by Singer.io target.";

/// Commit message for document batch inserts.
pub const DOCUMENTS_COMMIT_MSG: &str = "Documents insert by Singer.io target.";

/// Which graph of the database a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphType {
    /// Data documents.
    #[default]
    Instance,
    /// Class definitions.
    Schema,
}

impl GraphType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Instance => "instance",
            GraphType::Schema => "schema",
        }
    }
}

impl std::fmt::Display for GraphType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DatabaseError>> + Send + 'a>>;

/// Document database backend. The engine only ever talks to this trait.
///
/// Implementations: TerminusDB over HTTP, in-memory (dry run / tests).
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document, or a JSON array of documents, in a
    /// single commit.
    fn update_document<'a>(
        &'a self,
        documents: &'a serde_json::Value,
        commit_message: &'a str,
        graph: GraphType,
    ) -> StoreFuture<'a, ()>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}
