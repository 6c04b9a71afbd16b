//! Tool input schemas: derived from the typed parameter structs, then stripped
//! of the nullable markers MCP clients reject.

use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde_json::{Map, Value};

/// Removes nullable markers from a JSON schema, recursively.
///
/// * `anyOf` loses its `{"type": "null"}` branches; a single survivor is inlined.
/// * `type: [T, "null"]` collapses to `type: T`.
/// * `type: "null"` and `default: null` are dropped.
pub fn sanitize_schema(schema: Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(sanitize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_schema).collect()),
        other => other,
    }
}

fn is_null_schema(v: &Value) -> bool {
    v.get("type").and_then(|t| t.as_str()) == Some("null")
}

fn sanitize_object(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            "anyOf" => {
                let Value::Array(branches) = value else {
                    out.insert(key, sanitize_schema(value));
                    continue;
                };
                let mut kept: Vec<Value> = branches
                    .into_iter()
                    .filter(|b| !is_null_schema(b))
                    .map(sanitize_schema)
                    .collect();
                if kept.len() == 1 {
                    if let Some(Value::Object(inner)) = kept.pop() {
                        for (k, v) in inner {
                            out.entry(k).or_insert(v);
                        }
                    }
                } else if !kept.is_empty() {
                    out.insert(key, Value::Array(kept));
                }
            }
            "type" => match value {
                Value::Array(types) => {
                    let mut kept: Vec<Value> =
                        types.into_iter().filter(|t| t != "null").collect();
                    match kept.len() {
                        0 => {}
                        1 => {
                            out.insert(key, kept.remove(0));
                        }
                        _ => {
                            out.insert(key, Value::Array(kept));
                        }
                    }
                }
                Value::String(ref t) if t == "null" => {}
                other => {
                    out.insert(key, other);
                }
            },
            "default" if value.is_null() => {}
            // Keys here are property names, not keywords.
            "properties" | "definitions" | "$defs" | "patternProperties" => {
                let value = match value {
                    Value::Object(named) => Value::Object(
                        named
                            .into_iter()
                            .map(|(name, schema)| (name, sanitize_schema(schema)))
                            .collect(),
                    ),
                    other => other,
                };
                out.insert(key, value);
            }
            _ => {
                out.insert(key, sanitize_schema(value));
            }
        }
    }
    out
}

/// Sanitized input schema for a parameter type.
pub fn input_schema_for<T: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(schema).unwrap_or_else(|e| {
        tracing::error!("schema serialization failed: {}", e);
        Value::Object(Map::new())
    });
    match sanitize_schema(value) {
        Value::Object(mut map) => {
            map.remove("$schema");
            map.entry("type").or_insert_with(|| Value::String("object".into()));
            map
        }
        _ => Map::new(),
    }
}
