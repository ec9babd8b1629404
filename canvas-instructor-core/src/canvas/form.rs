//! Bracket-style form encoding used by Canvas update endpoints
//! (`assignment[due_at]=...`, `module_item[published]=true`).

use serde_json::Value;

/// Flattens a JSON value into form pairs under `prefix`.
///
/// Objects nest as `prefix[key][sub]`, arrays as `prefix[key][]` with one pair
/// per element, and `null` fields are left out. An empty prefix leaves
/// top-level keys bare.
pub fn to_form_pairs(prefix: &str, data: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    flatten(prefix, data, &mut pairs);
    pairs
}

fn flatten(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (field, nested) in map {
                let nested_key = if key.is_empty() {
                    field.clone()
                } else {
                    format!("{key}[{field}]")
                };
                flatten(&nested_key, nested, out);
            }
        }
        Value::Array(elements) => {
            let array_key = format!("{key}[]");
            for element in elements {
                match element {
                    Value::Object(_) | Value::Array(_) => flatten(&array_key, element, out),
                    Value::Null => {}
                    scalar => out.push((array_key.clone(), scalar_to_string(scalar))),
                }
            }
        }
        scalar => out.push((key.to_string(), scalar_to_string(scalar))),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
