use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::TargetError;
use crate::schema::{FLATTEN_SEP, FieldType, ScalarType};
use crate::streams::StreamDefinition;

/// Validate a record and turn it into a document carrying `@type` and a
/// deterministic `@id`.
pub fn materialize(
    stream: &str,
    definition: &StreamDefinition,
    record: Map<String, Value>,
    flatten: bool,
) -> Result<Map<String, Value>, TargetError> {
    let record = Value::Object(record);
    definition.validate(stream, &record)?;
    let Value::Object(record) = record else {
        return Err(TargetError::InvalidField { field: "record".into(), expected: "a JSON object" });
    };

    let mut doc = Map::new();
    if flatten {
        flatten_into(&mut doc, None, record, &definition.class.fields);
    } else {
        doc.extend(record);
    }
    doc.insert("@type".into(), Value::String(stream.to_string()));

    let id = document_id(stream, &definition.key_properties, &doc)?;
    doc.insert("@id".into(), Value::String(id));
    Ok(doc)
}

/// Derive a document identifier.
///
/// With key properties: `stream/v1+v2+...`, each value percent-encoded.
/// Without: `stream/<sha256 of the document content>`.
pub fn document_id(stream: &str, key_properties: &[String], doc: &Map<String, Value>) -> Result<String, TargetError> {
    if key_properties.is_empty() {
        return Ok(format!("{stream}/{}", content_hash(doc)));
    }

    let mut parts = Vec::with_capacity(key_properties.len());
    for key in key_properties {
        let value = doc
            .get(key)
            .ok_or_else(|| TargetError::missing(key.clone(), format!("key property of a record in stream {stream}")))?;
        parts.push(urlencoding::encode(&key_text(value)).into_owned());
    }
    Ok(format!("{stream}/{}", parts.join("+")))
}

fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Hex SHA-256 over the document's canonical JSON, ignoring `@id`.
fn content_hash(doc: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    for (k, v) in doc.iter().filter(|(k, _)| k.as_str() != "@id") {
        let text = v.to_string();
        hasher.update((k.len() as u64).to_le_bytes());
        hasher.update(k.as_bytes());
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Flatten a record the same way its class was flattened.
///
/// A key the class declares is kept as is (arrays typed `xsd:string` become
/// their JSON text, `sys:JSON` objects stay whole). Objects the class
/// expanded are descended into; a `null` in their place means every child
/// is absent. Keys the class does not know pass through unchanged.
fn flatten_into(
    out: &mut Map<String, Value>,
    prefix: Option<&str>,
    record: Map<String, Value>,
    fields: &BTreeMap<String, FieldType>,
) {
    for (k, v) in record {
        let key = match prefix {
            Some(p) => format!("{p}{FLATTEN_SEP}{k}"),
            None => k,
        };
        if let Some(field) = fields.get(&key) {
            let value = match v {
                Value::Array(_) if field.scalar() == ScalarType::String => Value::String(v.to_string()),
                other => other,
            };
            out.insert(key, value);
            continue;
        }
        let expanded = {
            let child_prefix = format!("{key}{FLATTEN_SEP}");
            fields.keys().any(|f| f.starts_with(&child_prefix))
        };
        match v {
            Value::Object(nested) if expanded => flatten_into(out, Some(&key), nested, fields),
            Value::Null if expanded => {}
            other => {
                out.insert(key, other);
            }
        }
    }
}
