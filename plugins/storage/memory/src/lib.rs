use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use target_api::{DatabaseError, DocumentStore, GraphType, StoreFuture};

// ═══════════════════════════════════════════════════════════════
//  Commit
// ═══════════════════════════════════════════════════════════════

/// One accepted `update_document` call.
#[derive(Debug, Clone)]
pub struct Commit {
    pub graph: GraphType,
    pub message: String,
    pub documents: Vec<serde_json::Value>,
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

/// In-memory document store. Keeps every commit for inspection; used for
/// dry runs, where nothing should reach a real database.
///
/// `with_failures(n)` makes the next `n` writes fail, to exercise the
/// engine's insert-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    commits: RwLock<Vec<Commit>>,
    failures_left: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failures(failures: usize) -> Self {
        Self {
            commits: RwLock::new(Vec::new()),
            failures_left: AtomicUsize::new(failures),
        }
    }

    /// Make the next `n` writes fail.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub async fn commits(&self) -> Vec<Commit> {
        self.commits.read().await.clone()
    }

    /// Every document written to `graph`, in commit order.
    pub async fn documents(&self, graph: GraphType) -> Vec<serde_json::Value> {
        self.commits
            .read()
            .await
            .iter()
            .filter(|c| c.graph == graph)
            .flat_map(|c| c.documents.iter().cloned())
            .collect()
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DocumentStore for MemoryStore {
    fn update_document<'a>(
        &'a self,
        documents: &'a serde_json::Value,
        commit_message: &'a str,
        graph: GraphType,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.take_failure() {
                return Err(DatabaseError::rejected(500, "injected failure"));
            }
            let documents = match documents {
                serde_json::Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            tracing::debug!(%graph, count = documents.len(), "memory commit");
            self.commits.write().await.push(Commit {
                graph,
                message: commit_message.to_string(),
                documents,
            });
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
