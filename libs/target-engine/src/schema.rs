use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::error::TargetError;

/// Separator used when nested object fields are flattened.
pub const FLATTEN_SEP: &str = "__";

// ════════════════════════════════════════════════════════════════
//  Target types
// ════════════════════════════════════════════════════════════════

/// Scalar types a class field can have in TerminusDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Decimal,
    Integer,
    Boolean,
    DateTime,
    /// Arbitrary JSON (`sys:JSON`), for objects and arrays.
    Json,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "xsd:string",
            ScalarType::Decimal => "xsd:decimal",
            ScalarType::Integer => "xsd:integer",
            ScalarType::Boolean => "xsd:boolean",
            ScalarType::DateTime => "xsd:dateTime",
            ScalarType::Json => "sys:JSON",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of one class field: a scalar, or a scalar wrapped in `Optional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Required(ScalarType),
    Optional(ScalarType),
}

impl FieldType {
    pub fn scalar(&self) -> ScalarType {
        match self {
            FieldType::Required(s) | FieldType::Optional(s) => *s,
        }
    }

    fn optional(self) -> Self {
        FieldType::Optional(self.scalar())
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldType::Required(s) => Value::String(s.as_str().to_string()),
            FieldType::Optional(s) => json!({"@type": "Optional", "@class": s.as_str()}),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Required(s) => write!(f, "{s}"),
            FieldType::Optional(s) => write!(f, "optional<{s}>"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Type descriptor (JSON Schema side)
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => JsonType::String,
            "number" => JsonType::Number,
            "integer" => JsonType::Integer,
            "boolean" => JsonType::Boolean,
            "object" => JsonType::Object,
            "array" => JsonType::Array,
            "null" => JsonType::Null,
            _ => return None,
        })
    }
}

/// `type` and `format` of one schema property.
struct TypeDescriptor {
    /// `None` when the property declares no `type` at all.
    types: Option<Vec<JsonType>>,
    date_time: bool,
}

impl TypeDescriptor {
    fn parse(stream: &str, name: &str, property: &Value) -> Result<Self, TargetError> {
        let invalid = |detail: String| TargetError::InvalidSchema { stream: stream.to_string(), detail };

        let names: Option<Vec<&str>> = match property.get("type") {
            None => None,
            Some(Value::String(t)) => Some(vec![t.as_str()]),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|t| t.as_str().ok_or_else(|| invalid(format!("property '{name}': type list must hold strings"))))
                    .collect::<Result<_, _>>()?,
            ),
            Some(other) => return Err(invalid(format!("property '{name}': unsupported type {other}"))),
        };

        let types = match names {
            None => None,
            Some(names) => Some(
                names
                    .into_iter()
                    .map(|t| JsonType::parse(t).ok_or_else(|| invalid(format!("property '{name}': unknown type '{t}'"))))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let date_time = property.get("format").and_then(Value::as_str) == Some("date-time");
        Ok(Self { types, date_time })
    }

    fn nullable(&self) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&JsonType::Null),
        }
    }

    /// The single non-null member, if there is exactly one.
    fn sole_type(&self) -> Option<JsonType> {
        let mut non_null = self.types.as_ref()?.iter().filter(|t| **t != JsonType::Null);
        match (non_null.next(), non_null.next()) {
            (Some(t), None) => Some(*t),
            _ => None,
        }
    }

    fn field_type(&self, flatten: bool) -> FieldType {
        if self.date_time {
            return FieldType::Required(ScalarType::DateTime);
        }
        let scalar = match self.sole_type() {
            Some(JsonType::String) => ScalarType::String,
            Some(JsonType::Number) => ScalarType::Decimal,
            Some(JsonType::Integer) => ScalarType::Integer,
            Some(JsonType::Boolean) => ScalarType::Boolean,
            Some(JsonType::Array) if flatten => ScalarType::String,
            Some(JsonType::Object | JsonType::Array | JsonType::Null) | None => ScalarType::Json,
        };
        if self.nullable() {
            FieldType::Optional(scalar)
        } else {
            FieldType::Required(scalar)
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Class definition
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateOptions {
    /// Embed a `Lexical` key clause built from the key properties.
    pub declare_key: bool,
    /// Expand nested object properties into `parent__child` fields.
    pub flatten: bool,
}

/// A TerminusDB `Class` document derived from one stream's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub id: String,
    pub key: Option<Vec<String>>,
    pub fields: BTreeMap<String, FieldType>,
}

impl ClassDefinition {
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("@type".into(), Value::String("Class".into()));
        doc.insert("@id".into(), Value::String(self.id.clone()));
        if let Some(ref key) = self.key {
            doc.insert("@key".into(), json!({"@type": "Lexical", "@fields": key}));
        }
        for (name, field_type) in &self.fields {
            doc.insert(name.clone(), field_type.to_json());
        }
        Value::Object(doc)
    }
}

/// Translate a stream's JSON Schema into its class definition.
pub fn translate(
    stream: &str,
    schema: &Map<String, Value>,
    key_properties: &[String],
    options: TranslateOptions,
) -> Result<ClassDefinition, TargetError> {
    let properties = match schema.get("properties") {
        Some(Value::Object(p)) => p,
        Some(_) => {
            return Err(TargetError::InvalidSchema {
                stream: stream.to_string(),
                detail: "'properties' must be an object".into(),
            });
        }
        None => return Err(TargetError::missing("schema.properties", format!("stream {stream}"))),
    };

    let mut fields = BTreeMap::new();
    collect_fields(stream, properties, None, false, options.flatten, &mut fields)?;

    let key = (options.declare_key && !key_properties.is_empty()).then(|| key_properties.to_vec());

    Ok(ClassDefinition { id: stream.to_string(), key, fields })
}

fn collect_fields(
    stream: &str,
    properties: &Map<String, Value>,
    prefix: Option<&str>,
    parent_nullable: bool,
    flatten: bool,
    out: &mut BTreeMap<String, FieldType>,
) -> Result<(), TargetError> {
    for (name, property) in properties {
        let full_name = match prefix {
            Some(p) => format!("{p}{FLATTEN_SEP}{name}"),
            None => name.clone(),
        };
        let descriptor = TypeDescriptor::parse(stream, &full_name, property)?;

        if flatten && descriptor.sole_type() == Some(JsonType::Object) {
            if let Some(Value::Object(nested)) = property.get("properties") {
                let nullable = parent_nullable || descriptor.nullable();
                collect_fields(stream, nested, Some(&full_name), nullable, flatten, out)?;
                continue;
            }
        }

        let mut field_type = descriptor.field_type(flatten);
        if parent_nullable {
            field_type = field_type.optional();
        }
        out.insert(full_name, field_type);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn maps_scalar_types() {
        let s = schema(json!({"properties": {
            "name": {"type": "string"},
            "price": {"type": "number"},
            "qty": {"type": "integer"},
            "active": {"type": "boolean"},
            "meta": {"type": "object"},
            "tags": {"type": "array"},
        }}));
        let class = translate("items", &s, &[], TranslateOptions::default()).unwrap();
        assert_eq!(class.fields["name"], FieldType::Required(ScalarType::String));
        assert_eq!(class.fields["price"], FieldType::Required(ScalarType::Decimal));
        assert_eq!(class.fields["qty"], FieldType::Required(ScalarType::Integer));
        assert_eq!(class.fields["active"], FieldType::Required(ScalarType::Boolean));
        assert_eq!(class.fields["meta"], FieldType::Required(ScalarType::Json));
        assert_eq!(class.fields["tags"], FieldType::Required(ScalarType::Json));
    }

    #[test]
    fn null_union_is_optional_in_any_order() {
        let s = schema(json!({"properties": {
            "a": {"type": ["null", "number"]},
            "b": {"type": ["string", "null"]},
        }}));
        let class = translate("t", &s, &[], TranslateOptions::default()).unwrap();
        assert_eq!(class.fields["a"], FieldType::Optional(ScalarType::Decimal));
        assert_eq!(class.fields["b"], FieldType::Optional(ScalarType::String));
        assert_eq!(class.to_json()["a"], json!({"@type": "Optional", "@class": "xsd:decimal"}));
    }

    #[test]
    fn date_time_overrides_everything() {
        let s = schema(json!({"properties": {
            "ts": {"type": "string", "format": "date-time"},
            "maybe_ts": {"type": ["null", "string"], "format": "date-time"},
        }}));
        let class = translate("t", &s, &[], TranslateOptions::default()).unwrap();
        assert_eq!(class.fields["ts"], FieldType::Required(ScalarType::DateTime));
        assert_eq!(class.fields["maybe_ts"], FieldType::Required(ScalarType::DateTime));
    }

    #[test]
    fn field_set_matches_property_set() {
        let s = schema(json!({"properties": {
            "a": {"type": "string"},
            "b": {"type": ["null", "integer"]},
            "c": {},
            "d": {"type": ["string", "integer"]},
            "e": {"type": "null"},
        }}));
        let class = translate("t", &s, &[], TranslateOptions::default()).unwrap();
        let names: Vec<_> = class.fields.keys().cloned().collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        assert_eq!(class.fields["c"], FieldType::Optional(ScalarType::Json));
        assert_eq!(class.fields["d"], FieldType::Required(ScalarType::Json));
        assert_eq!(class.fields["e"], FieldType::Optional(ScalarType::Json));
    }

    #[test]
    fn class_document_shape() {
        let s = schema(json!({"properties": {"ip": {"type": "string"}}}));
        let class = translate("my_ip", &s, &["ip".to_string()], TranslateOptions::default()).unwrap();
        assert_eq!(class.to_json(), json!({"@type": "Class", "@id": "my_ip", "ip": "xsd:string"}));
    }

    #[test]
    fn key_clause_only_when_declared() {
        let s = schema(json!({"properties": {"id": {"type": "integer"}}}));
        let keys = vec!["id".to_string()];
        let opts = TranslateOptions { declare_key: true, ..Default::default() };
        let class = translate("t", &s, &keys, opts).unwrap();
        assert_eq!(class.to_json()["@key"], json!({"@type": "Lexical", "@fields": ["id"]}));

        let class = translate("t", &s, &[], opts).unwrap();
        assert!(class.key.is_none());
    }

    #[test]
    fn flatten_expands_nested_objects() {
        let s = schema(json!({"properties": {
            "user": {"type": ["null", "object"], "properties": {
                "name": {"type": "string"},
                "tags": {"type": "array"},
            }},
        }}));
        let opts = TranslateOptions { flatten: true, ..Default::default() };
        let class = translate("t", &s, &[], opts).unwrap();
        assert_eq!(class.fields.len(), 2);
        assert_eq!(class.fields["user__name"], FieldType::Optional(ScalarType::String));
        assert_eq!(class.fields["user__tags"], FieldType::Optional(ScalarType::String));
    }

    #[test]
    fn rejects_unknown_type_and_missing_properties() {
        let s = schema(json!({"properties": {"a": {"type": "uuid"}}}));
        let err = translate("t", &s, &[], TranslateOptions::default()).unwrap_err();
        assert!(matches!(err, TargetError::InvalidSchema { .. }));

        let err = translate("t", &Map::new(), &[], TranslateOptions::default()).unwrap_err();
        assert!(matches!(err, TargetError::MissingField { ref field, .. } if field == "schema.properties"));
    }
}
