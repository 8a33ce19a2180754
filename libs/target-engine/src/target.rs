use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use target_api::{DocumentStore, GraphType, SCHEMA_COMMIT_MSG};

use crate::batch::{BatchFlusher, FlushOutcome, Offer};
use crate::checkpoint::Checkpoint;
use crate::config::TargetSettings;
use crate::error::TargetError;
use crate::error_log::{ErrorLog, InsertKind};
use crate::materialize::materialize;
use crate::message::Message;
use crate::streams::StreamStore;

/// What a finished run reports back to the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    /// Checkpoint to emit, if one is safe.
    pub state: Option<Value>,
    pub schemas_inserted: usize,
    pub documents_inserted: usize,
    pub documents_dropped: usize,
    pub duplicates_skipped: usize,
    pub batches_failed: usize,
}

/// The stream-to-document engine: one instance per run.
pub struct Target {
    store: Arc<dyn DocumentStore>,
    streams: StreamStore,
    batch: BatchFlusher,
    checkpoint: Checkpoint,
    error_log: ErrorLog,
    flatten: bool,
    summary: RunSummary,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("store", &self.store.name())
            .field("streams", &self.streams)
            .field("batch", &self.batch)
            .field("checkpoint", &self.checkpoint)
            .finish()
    }
}

impl Target {
    pub fn new(store: Arc<dyn DocumentStore>, settings: &TargetSettings) -> Self {
        let error_log = ErrorLog::new(&settings.error_log);
        let mut batch = BatchFlusher::new(settings.buffer, error_log.clone());
        if settings.dedup_across_batches {
            batch = batch.with_cross_batch_dedup();
        }
        Self {
            store,
            streams: StreamStore::new(settings.translate_options()),
            batch,
            checkpoint: Checkpoint::new(),
            error_log,
            flatten: settings.flatten_records,
            summary: RunSummary::default(),
        }
    }

    pub fn checkpoint(&self) -> Option<&Value> {
        self.checkpoint.current()
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Consume every line of `reader`, then flush and return the summary.
    pub async fn persist_lines<R>(mut self, reader: R) -> Result<RunSummary, TargetError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            self.process_line(&line).await?;
        }
        Ok(self.finish().await)
    }

    pub async fn process_line(&mut self, line: &str) -> Result<(), TargetError> {
        if line.trim().is_empty() {
            tracing::debug!("skipping blank line");
            return Ok(());
        }
        match Message::parse(line)? {
            Message::Record { stream, record } => self.on_record(&stream, record).await,
            Message::Schema { stream, schema, key_properties } => self.on_schema(&stream, schema, key_properties).await,
            Message::State { value } => {
                self.checkpoint.observe_state(value);
                Ok(())
            }
        }
    }

    async fn on_record(&mut self, stream: &str, record: serde_json::Map<String, Value>) -> Result<(), TargetError> {
        let definition = self.streams.lookup(stream)?;
        let document = materialize(stream, definition, record, self.flatten)?;

        self.checkpoint.observe_record();

        match self.batch.offer(self.store.as_ref(), document).await {
            Offer::Duplicate => self.summary.duplicates_skipped += 1,
            Offer::Accepted(Some(outcome)) => self.account(outcome),
            Offer::Accepted(None) => {}
        }
        Ok(())
    }

    async fn on_schema(
        &mut self,
        stream: &str,
        schema: serde_json::Map<String, Value>,
        key_properties: Option<Vec<String>>,
    ) -> Result<(), TargetError> {
        let class = self.streams.declare(stream, schema, key_properties)?.class.to_json();

        match self.store.update_document(&class, SCHEMA_COMMIT_MSG, GraphType::Schema).await {
            Ok(()) => {
                tracing::info!(stream = %stream, "schema inserted");
                self.summary.schemas_inserted += 1;
            }
            Err(error) => {
                tracing::info!(stream = %stream, error = %error, "error inserting schema");
                self.error_log.record(InsertKind::Schema, &error, &class);
            }
        }
        Ok(())
    }

    fn account(&mut self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Empty => {}
            FlushOutcome::Inserted(n) => self.summary.documents_inserted += n,
            FlushOutcome::Dropped { count, .. } => {
                self.summary.documents_dropped += count;
                self.summary.batches_failed += 1;
            }
        }
    }

    /// Flush the partial batch and hand back the summary with the final
    /// checkpoint.
    pub async fn finish(mut self) -> RunSummary {
        let outcome = self.batch.flush(self.store.as_ref()).await;
        self.account(outcome);

        let mut summary = self.summary;
        summary.state = self.checkpoint.into_value();
        tracing::debug!(
            schemas = summary.schemas_inserted,
            documents = summary.documents_inserted,
            dropped = summary.documents_dropped,
            duplicates = summary.duplicates_skipped,
            "run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_memory::MemoryStore;

    fn settings(dir: &tempfile::TempDir, buffer: usize) -> TargetSettings {
        TargetSettings {
            buffer,
            error_log: dir.path().join("errors").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    const SCHEMA: &str = r#"{"type":"SCHEMA","stream":"users","schema":{"properties":{"id":{"type":"integer"}}},"key_properties":["id"]}"#;

    #[tokio::test]
    async fn undeclared_stream_fails_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Target::new(Arc::new(MemoryStore::new()), &settings(&dir, 10));
        let err = target
            .process_line(r#"{"type":"RECORD","stream":"users","record":{"id":"not an int"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, TargetError::UndeclaredStream(ref s) if s == "users"));
    }

    #[tokio::test]
    async fn invalid_record_is_not_batched() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Target::new(Arc::new(MemoryStore::new()), &settings(&dir, 10));
        target.process_line(SCHEMA).await.unwrap();
        target.process_line(r#"{"type":"STATE","value":1}"#).await.unwrap();
        let err = target
            .process_line(r#"{"type":"RECORD","stream":"users","record":{"id":"x"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, TargetError::SchemaValidation { .. }));
        assert_eq!(target.pending(), 0);
        assert_eq!(target.checkpoint(), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn record_clears_checkpoint_until_next_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Target::new(Arc::new(MemoryStore::new()), &settings(&dir, 10));
        target.process_line(SCHEMA).await.unwrap();
        target.process_line(r#"{"type":"STATE","value":{"n":1}}"#).await.unwrap();
        target.process_line(r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#).await.unwrap();
        assert_eq!(target.checkpoint(), None);
        assert_eq!(target.finish().await.state, None);
    }

    #[tokio::test]
    async fn schema_insert_failure_is_logged_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_failures(1));
        let mut target = Target::new(store.clone(), &settings(&dir, 10));
        target.process_line(SCHEMA).await.unwrap();
        target.process_line(r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#).await.unwrap();
        let summary = target.finish().await;

        assert_eq!(summary.schemas_inserted, 0);
        assert_eq!(summary.documents_inserted, 1);
        let log = std::fs::read_to_string(dir.path().join("errors")).unwrap();
        assert!(log.contains("Schema insert error:"));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Target::new(Arc::new(MemoryStore::new()), &settings(&dir, 10));
        target.process_line("   ").await.unwrap();
        assert_eq!(target.finish().await, RunSummary::default());
    }
}
