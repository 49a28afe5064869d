//! Tolerant extraction of array payloads from model responses.
//!
//! The model is instructed to return a JSON array, but in practice wraps it
//! in an object under varying keys. Precedence is explicit: a bare array
//! wins, then the preferred key, then the first array-valued field in
//! insertion order. Anything else is an empty result — unexpected shape is
//! never an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Pulls the payload array out of a parsed response value.
pub fn extract_array(value: &Value, preferred_key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get(preferred_key) {
                return items.clone();
            }
            // serde_json's preserve_order feature keeps map iteration in
            // insertion order, which defines which array wins here.
            for (_, field) in map {
                if let Value::Array(items) = field {
                    return items.clone();
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Parses a response body into typed items. Malformed JSON, unexpected
/// shapes, and individually undeserializable elements all degrade to fewer
/// (possibly zero) items rather than failing.
pub fn parse_items<T: DeserializeOwned>(content: &str, preferred_key: &str) -> Vec<T> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse model response as JSON: {e}");
            return Vec::new();
        }
    };

    extract_array(&value, preferred_key)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed item in model response: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::types::CompetencyDraft;

    #[test]
    fn test_bare_array_is_returned_as_is() {
        let items: Vec<CompetencyDraft> = parse_items(
            r#"[{"name": "API Design", "description": "REST and versioning."}]"#,
            "competencies",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "API Design");
    }

    #[test]
    fn test_preferred_key_wins_over_other_arrays() {
        let items: Vec<CompetencyDraft> = parse_items(
            r#"{
                "notes": [{"name": "Wrong", "description": ""}],
                "competencies": [{"name": "Right", "description": ""}]
            }"#,
            "competencies",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Right");
    }

    #[test]
    fn test_first_array_valued_field_in_insertion_order() {
        let items: Vec<CompetencyDraft> = parse_items(
            r#"{
                "title": "ignored",
                "skills": [{"name": "First", "description": ""}],
                "extras": [{"name": "Second", "description": ""}]
            }"#,
            "competencies",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "First");
    }

    #[test]
    fn test_non_array_preferred_key_falls_through() {
        let items: Vec<CompetencyDraft> = parse_items(
            r#"{
                "competencies": "not an array",
                "skills": [{"name": "Fallback", "description": ""}]
            }"#,
            "competencies",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Fallback");
    }

    #[test]
    fn test_object_with_no_array_is_empty() {
        let items: Vec<CompetencyDraft> =
            parse_items(r#"{"message": "no competencies here"}"#, "competencies");
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_json_is_empty_not_error() {
        let items: Vec<CompetencyDraft> = parse_items("not json at all {", "competencies");
        assert!(items.is_empty());
    }

    #[test]
    fn test_scalar_payload_is_empty() {
        let items: Vec<CompetencyDraft> = parse_items("42", "competencies");
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_elements_are_skipped_not_fatal() {
        let items: Vec<CompetencyDraft> = parse_items(
            r#"[{"name": "Kept", "description": ""}, "just a string", 7]"#,
            "competencies",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Kept");
    }
}
