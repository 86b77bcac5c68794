//! JSON Schema fragments for the resources the built-in suites exercise
//!
//! Schemas are plain `serde_json::Value`s; the helpers here only compose them.

use serde_json::{json, Map, Value};

/// Which properties of an object type are required
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Required {
    /// Every defined property
    #[default]
    All,
    /// No `required` keyword at all
    None,
    /// Exactly these properties
    Only(Vec<String>),
}

pub fn string_type() -> Value {
    json!({ "type": "string" })
}

pub fn integer_type() -> Value {
    json!({ "type": "integer" })
}

/// Properties every stored resource carries
pub fn common_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("id".into(), integer_type());
    properties.insert("createdAt".into(), string_type());
    properties.insert("updatedAt".into(), string_type());
    properties
}

/// `{type: array, items: schema}`
pub fn array_of(schema: Value) -> Value {
    json!({ "type": "array", "items": schema })
}

/// Names of every property, for a `required` list
pub fn require_all(properties: &Map<String, Value>) -> Vec<String> {
    properties.keys().cloned().collect()
}

/// An object type with the given properties
pub fn create_object_type(
    properties: Map<String, Value>,
    required: Required,
    additional_properties: bool,
) -> Value {
    let required = match required {
        Required::All => Some(require_all(&properties)),
        Required::None => None,
        Required::Only(keys) => Some(keys),
    };

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("additionalProperties".into(), json!(additional_properties));
    if let Some(required) = required {
        schema.insert("required".into(), json!(required));
    }
    Value::Object(schema)
}

/// A closed object type requiring every property
pub fn strict_object(properties: Map<String, Value>) -> Value {
    create_object_type(properties, Required::All, false)
}

pub fn user() -> Value {
    let mut properties = common_properties();
    properties.insert("email".into(), string_type());
    properties.insert("name".into(), string_type());
    strict_object(properties)
}

pub fn category() -> Value {
    let mut properties = common_properties();
    properties.insert("name".into(), string_type());
    strict_object(properties)
}

pub fn token() -> Value {
    let mut properties = Map::new();
    properties.insert("token".into(), string_type());
    strict_object(properties)
}

/// Look up a built-in schema by name
pub fn named(name: &str) -> Option<Value> {
    match name {
        "user" => Some(user()),
        "category" => Some(category()),
        "token" | "auth-token" => Some(token()),
        _ => None,
    }
}
