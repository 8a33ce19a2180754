use serde_json::{Map, Value};

use crate::error::TargetError;

/// One line of the Singer protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Record {
        stream: String,
        record: Map<String, Value>,
    },
    Schema {
        stream: String,
        schema: Map<String, Value>,
        /// `None` when the message omits `key_properties`; the stream store
        /// rejects that at declaration time.
        key_properties: Option<Vec<String>>,
    },
    State {
        value: Value,
    },
}

impl Message {
    /// Decode one input line. Any rejection is logged with the raw line
    /// before the error is returned.
    pub fn parse(line: &str) -> Result<Self, TargetError> {
        Self::decode(line).inspect_err(|e| tracing::error!(line = %line, error = %e, "unable to parse"))
    }

    fn decode(line: &str) -> Result<Self, TargetError> {
        let value: Value =
            serde_json::from_str(line).map_err(|source| TargetError::Parse { line: line.to_string(), source })?;

        let Value::Object(mut obj) = value else {
            return Err(TargetError::InvalidField { field: "message".into(), expected: "a JSON object" });
        };

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(TargetError::InvalidField { field: "type".into(), expected: "a string" }),
            None => return Err(TargetError::missing("type", line)),
        };

        match kind.as_str() {
            "RECORD" => {
                let stream = take_stream(&mut obj, line)?;
                let record = take_object(&mut obj, "record", line)?;
                Ok(Message::Record { stream, record })
            }
            "SCHEMA" => {
                let stream = take_stream(&mut obj, line)?;
                let schema = take_object(&mut obj, "schema", line)?;
                let key_properties = match obj.remove("key_properties") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(string_list(v, "key_properties")?),
                };
                Ok(Message::Schema { stream, schema, key_properties })
            }
            "STATE" => {
                let value = obj.remove("value").ok_or_else(|| TargetError::missing("value", line))?;
                Ok(Message::State { value })
            }
            _ => Err(TargetError::UnknownMessageType { kind, message: line.to_string() }),
        }
    }
}

fn take_stream(obj: &mut Map<String, Value>, line: &str) -> Result<String, TargetError> {
    match obj.remove("stream") {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TargetError::InvalidField { field: "stream".into(), expected: "a string" }),
        None => Err(TargetError::missing("stream", line)),
    }
}

fn take_object(obj: &mut Map<String, Value>, field: &str, line: &str) -> Result<Map<String, Value>, TargetError> {
    match obj.remove(field) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(TargetError::InvalidField { field: field.into(), expected: "a JSON object" }),
        None => Err(TargetError::missing(field, line)),
    }
}

fn string_list(value: Value, field: &str) -> Result<Vec<String>, TargetError> {
    let invalid = || TargetError::InvalidField { field: field.into(), expected: "a list of strings" };
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}
