use std::collections::HashMap;

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

use crate::error::TargetError;
use crate::schema::{self, ClassDefinition, TranslateOptions};

/// Everything the engine knows about one declared stream.
pub struct StreamDefinition {
    pub schema: Value,
    pub key_properties: Vec<String>,
    pub class: ClassDefinition,
    validator: JSONSchema,
}

impl std::fmt::Debug for StreamDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDefinition")
            .field("key_properties", &self.key_properties)
            .field("class", &self.class)
            .finish()
    }
}

impl StreamDefinition {
    /// Validate a record against the stream's schema, collecting every
    /// violated constraint.
    pub fn validate(&self, stream: &str, record: &Value) -> Result<(), TargetError> {
        if let Err(errors) = self.validator.validate(record) {
            let errors = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() { e.to_string() } else { format!("{path}: {e}") }
                })
                .collect();
            return Err(TargetError::SchemaValidation { stream: stream.to_string(), errors });
        }
        Ok(())
    }
}

/// Per-stream schema, validator and key state for the length of a run.
#[derive(Debug, Default)]
pub struct StreamStore {
    streams: HashMap<String, StreamDefinition>,
    options: TranslateOptions,
}

impl StreamStore {
    pub fn new(options: TranslateOptions) -> Self {
        Self { streams: HashMap::new(), options }
    }

    /// Declare (or redeclare) a stream. Compiles the validator and derives
    /// the class definition; any previous definition is replaced.
    pub fn declare(
        &mut self,
        stream: &str,
        schema: Map<String, Value>,
        key_properties: Option<Vec<String>>,
    ) -> Result<&StreamDefinition, TargetError> {
        let key_properties =
            key_properties.ok_or_else(|| TargetError::missing("key_properties", format!("schema of stream {stream}")))?;

        let class = schema::translate(stream, &schema, &key_properties, self.options)?;

        let schema = Value::Object(schema);
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft4)
            .compile(&schema)
            .map_err(|e| TargetError::InvalidSchema { stream: stream.to_string(), detail: e.to_string() })?;

        let definition = StreamDefinition { schema, key_properties, class, validator };
        self.streams.insert(stream.to_string(), definition);
        self.lookup(stream)
    }

    pub fn lookup(&self, stream: &str) -> Result<&StreamDefinition, TargetError> {
        self.streams
            .get(stream)
            .ok_or_else(|| TargetError::UndeclaredStream(stream.to_string()))
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
