use std::collections::HashSet;

use serde_json::{Map, Value};
use target_api::{DOCUMENTS_COMMIT_MSG, DatabaseError, DocumentStore, GraphType};

use crate::error_log::{ErrorLog, InsertKind};

pub const DEFAULT_BUFFER: usize = 1000;

/// Result of offering a document to the batch.
#[derive(Debug)]
pub enum Offer {
    /// Appended; carries the flush outcome when the batch hit its threshold.
    Accepted(Option<FlushOutcome>),
    /// An identical `@id` is already pending; the document was dropped.
    Duplicate,
}

#[derive(Debug)]
pub enum FlushOutcome {
    Empty,
    Inserted(usize),
    /// The insert failed and the batch was dropped.
    Dropped { count: usize, error: DatabaseError },
}

/// Accumulates documents and bulk-inserts them once `threshold` is reached.
///
/// Failed batches are not retried: they go to the error log and the
/// pending batch is cleared either way.
#[derive(Debug)]
pub struct BatchFlusher {
    threshold: usize,
    pending: Vec<Value>,
    pending_ids: HashSet<String>,
    /// Ids inserted by earlier batches; only kept with `dedup_across_batches`.
    committed_ids: Option<HashSet<String>>,
    error_log: ErrorLog,
}

impl BatchFlusher {
    pub fn new(threshold: usize, error_log: ErrorLog) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            pending: Vec::with_capacity(threshold.min(65536)),
            pending_ids: HashSet::new(),
            committed_ids: None,
            error_log,
        }
    }

    /// Also suppress ids that were inserted by an earlier flush of this run.
    pub fn with_cross_batch_dedup(mut self) -> Self {
        self.committed_ids = Some(HashSet::new());
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_known(&self, id: &str) -> bool {
        self.pending_ids.contains(id) || self.committed_ids.as_ref().is_some_and(|ids| ids.contains(id))
    }

    pub async fn offer(&mut self, store: &dyn DocumentStore, document: Map<String, Value>) -> Offer {
        let id = document.get("@id").and_then(Value::as_str).map(str::to_owned);
        if let Some(ref id) = id {
            if self.is_known(id) {
                tracing::debug!(id = %id, "duplicate document, skipping");
                return Offer::Duplicate;
            }
        }
        if let Some(id) = id {
            self.pending_ids.insert(id);
        }
        self.pending.push(Value::Object(document));

        if self.pending.len() >= self.threshold {
            Offer::Accepted(Some(self.flush(store).await))
        } else {
            Offer::Accepted(None)
        }
    }

    pub async fn flush(&mut self, store: &dyn DocumentStore) -> FlushOutcome {
        if self.pending.is_empty() {
            return FlushOutcome::Empty;
        }

        let count = self.pending.len();
        let batch = Value::Array(std::mem::take(&mut self.pending));
        let ids = std::mem::take(&mut self.pending_ids);

        match store.update_document(&batch, DOCUMENTS_COMMIT_MSG, GraphType::Instance).await {
            Ok(()) => {
                tracing::info!(store = %store.name(), count, "documents inserted");
                if let Some(ref mut committed) = self.committed_ids {
                    committed.extend(ids);
                }
                FlushOutcome::Inserted(count)
            }
            Err(error) => {
                tracing::info!(store = %store.name(), count, error = %error, "error inserting documents, batch dropped");
                self.error_log.record(InsertKind::Document, &error, &batch);
                FlushOutcome::Dropped { count, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage_memory::MemoryStore;

    fn doc(id: &str) -> Map<String, Value> {
        json!({"@type": "t", "@id": id}).as_object().cloned().unwrap()
    }

    fn flusher(threshold: usize, dir: &tempfile::TempDir) -> BatchFlusher {
        BatchFlusher::new(threshold, ErrorLog::new(dir.path().join("errors")))
    }

    #[tokio::test]
    async fn flushes_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut batch = flusher(2, &dir);

        assert!(matches!(batch.offer(&store, doc("t/1")).await, Offer::Accepted(None)));
        assert!(matches!(
            batch.offer(&store, doc("t/2")).await,
            Offer::Accepted(Some(FlushOutcome::Inserted(2)))
        ));
        assert!(batch.is_empty());

        let commits = store.commits().await;
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, DOCUMENTS_COMMIT_MSG);
        assert_eq!(commits[0].graph, GraphType::Instance);
    }

    #[tokio::test]
    async fn duplicates_within_batch_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut batch = flusher(10, &dir);

        batch.offer(&store, doc("t/1")).await;
        assert!(matches!(batch.offer(&store, doc("t/1")).await, Offer::Duplicate));
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn duplicates_across_batches_pass_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut batch = flusher(1, &dir);

        batch.offer(&store, doc("t/1")).await;
        batch.offer(&store, doc("t/1")).await;
        assert_eq!(store.documents(GraphType::Instance).await.len(), 2);
    }

    #[tokio::test]
    async fn cross_batch_dedup_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut batch = flusher(1, &dir).with_cross_batch_dedup();

        batch.offer(&store, doc("t/1")).await;
        assert!(matches!(batch.offer(&store, doc("t/1")).await, Offer::Duplicate));
        assert_eq!(store.documents(GraphType::Instance).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_flush_clears_batch_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::with_failures(1);
        let mut batch = flusher(10, &dir).with_cross_batch_dedup();

        batch.offer(&store, doc("t/1")).await;
        batch.offer(&store, doc("t/2")).await;
        let outcome = batch.flush(&store).await;
        assert!(matches!(outcome, FlushOutcome::Dropped { count: 2, .. }));
        assert!(batch.is_empty());

        let log = std::fs::read_to_string(dir.path().join("errors")).unwrap();
        assert!(log.contains("Document insert error:"));
        assert!(log.contains("t/2"));

        // dropped ids are forgotten, so the record can be sent again
        assert!(matches!(batch.offer(&store, doc("t/1")).await, Offer::Accepted(None)));
        assert!(matches!(batch.flush(&store).await, FlushOutcome::Inserted(1)));
    }

    #[tokio::test]
    async fn flushing_empty_batch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut batch = flusher(10, &dir);
        assert!(matches!(batch.flush(&store).await, FlushOutcome::Empty));
        assert!(store.commits().await.is_empty());
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let batch = BatchFlusher::new(0, ErrorLog::default());
        assert_eq!(batch.threshold(), 1);
    }
}
