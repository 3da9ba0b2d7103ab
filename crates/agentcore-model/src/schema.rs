// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! JSON Schema (draft-07 style) validation for `tool_use` input, and a
//! deterministic rewrite pass for providers that only accept a strict
//! subset (no `format`, every property required, `additionalProperties:
//! false`) — §6 of the agent-core specification.

use jsonschema::JSONSchema;

/// Validate `input` against `schema`, returning a human-readable error
/// message on the first failure. Used at `block_stop` when finalizing a
/// `tool_use` block.
pub fn validate(schema: &serde_json::Value, input: &serde_json::Value) -> Result<(), String> {
    let compiled = JSONSchema::compile(schema).map_err(|e| format!("invalid schema: {e}"))?;
    compiled.validate(input).map_err(|errors| {
        errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    })
}

/// Rewrite a draft-07 `parameters` schema into the strict subset some
/// providers require: no `format` keyword, every property folded into
/// `required`, `additionalProperties: false` everywhere an object type
/// appears. Optionality that would have been expressed via an absent
/// `required` entry is folded into the property's `description` instead,
/// since the strict form cannot express it structurally.
pub fn to_strict_subset(schema: &serde_json::Value) -> serde_json::Value {
    let mut out = schema.clone();
    strip_format_recursive(&mut out);
    force_all_required_and_closed(&mut out);
    out
}

fn strip_format_recursive(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("format");
            for v in map.values_mut() {
                strip_format_recursive(v);
            }
        }
        serde_json::Value::Array(items) => {
            for v in items {
                strip_format_recursive(v);
            }
        }
        _ => {}
    }
}

fn force_all_required_and_closed(value: &mut serde_json::Value) {
    let serde_json::Value::Object(map) = value else { return };
    let is_object_type = matches!(map.get("type"), Some(serde_json::Value::String(t)) if t == "object");

    if is_object_type {
        let original_required: std::collections::HashSet<String> = map
            .get("required")
            .and_then(|r| r.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        if let Some(serde_json::Value::Object(props)) = map.get_mut("properties") {
            for (name, prop_schema) in props.iter_mut() {
                if !original_required.contains(name) {
                    note_optional_in_description(prop_schema);
                }
            }
            let all_names: Vec<String> = props.keys().cloned().collect();
            map.insert("required".into(), serde_json::Value::Array(
                all_names.into_iter().map(serde_json::Value::String).collect(),
            ));
        }
        map.insert("additionalProperties".into(), serde_json::Value::Bool(false));
    }

    if let Some(props) = map.get_mut("properties").and_then(|p| p.as_object_mut()) {
        for v in props.values_mut() {
            force_all_required_and_closed(v);
        }
    }
    if let Some(items) = map.get_mut("items") {
        force_all_required_and_closed(items);
    }
}

fn note_optional_in_description(prop_schema: &mut serde_json::Value) {
    let serde_json::Value::Object(map) = prop_schema else { return };
    let suffix = " (optional)";
    let current = map.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string();
    if !current.ends_with(suffix) {
        let new_desc = if current.is_empty() { suffix.trim_start().to_string() } else { format!("{current}{suffix}") };
        map.insert("description".into(), serde_json::Value::String(new_desc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "format": "uri" },
                "limit": { "type": "integer", "description": "max rows" }
            },
            "required": ["path"]
        })
    }

    #[test]
    fn validate_accepts_matching_input() {
        let schema = sample_schema();
        assert!(validate(&schema, &json!({"path": "/a"})).is_ok());
    }

    #[test]
    fn validate_rejects_missing_required() {
        let schema = sample_schema();
        assert!(validate(&schema, &json!({"limit": 3})).is_err());
    }

    #[test]
    fn strict_subset_strips_format() {
        let strict = to_strict_subset(&sample_schema());
        assert!(strict["properties"]["path"].get("format").is_none());
    }

    #[test]
    fn strict_subset_forces_all_properties_required() {
        let strict = to_strict_subset(&sample_schema());
        let required: Vec<&str> = strict["required"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert!(required.contains(&"path"));
        assert!(required.contains(&"limit"));
    }

    #[test]
    fn strict_subset_notes_optionality_in_description() {
        let strict = to_strict_subset(&sample_schema());
        let desc = strict["properties"]["limit"]["description"].as_str().unwrap();
        assert!(desc.contains("optional"));
    }

    #[test]
    fn strict_subset_sets_additional_properties_false() {
        let strict = to_strict_subset(&sample_schema());
        assert_eq!(strict["additionalProperties"], json!(false));
    }
}
