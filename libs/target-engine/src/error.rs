use target_api::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("unable to parse line: {source}\n{line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required key '{field}': {context}")]
    MissingField { field: String, context: String },

    #[error("field '{field}' must be {expected}")]
    InvalidField { field: String, expected: &'static str },

    #[error("a record for stream {0} was encountered before a corresponding schema")]
    UndeclaredStream(String),

    #[error("unknown message type {kind} in message {message}")]
    UnknownMessageType { kind: String, message: String },

    #[error("invalid schema for stream {stream}: {detail}")]
    InvalidSchema { stream: String, detail: String },

    #[error("record for stream {stream} failed validation: {}", errors.join("; "))]
    SchemaValidation { stream: String, errors: Vec<String> },

    #[error("config error: {0}")]
    Config(String),

    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TargetError {
    pub(crate) fn missing(field: impl Into<String>, context: impl Into<String>) -> Self {
        TargetError::MissingField { field: field.into(), context: context.into() }
    }
}
