pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod error_log;
pub mod materialize;
pub mod message;
pub mod schema;
pub mod streams;
mod target;

pub use batch::{BatchFlusher, FlushOutcome, Offer};
pub use checkpoint::{Checkpoint, emit_state};
pub use config::{TargetSettings, load_config};
pub use error::TargetError;
pub use error_log::ErrorLog;
pub use message::Message;
pub use schema::{ClassDefinition, FieldType, ScalarType, TranslateOptions};
pub use streams::{StreamDefinition, StreamStore};
pub use target::{RunSummary, Target};
