//! Best-effort structured extraction from free-form model output.
//!
//! The tag and checklist stages request fenced JSON, but the model is free
//! text; extraction therefore never fails, it only tags its result.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Key under which unparseable tag output is preserved.
pub const RAW_TAGS_KEY: &str = "tags_raw";

/// Outcome of a lenient parse: either a decoded JSON array or the raw
/// candidate text when decoding failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    Fallback(String),
}

impl Extraction {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("fence pattern is valid")
    })
}

/// Returns the candidate payload: the first fenced code block (optionally
/// tagged `json`) if present, else the whole trimmed response.
pub fn fenced_payload(raw: &str) -> String {
    match fence_pattern().captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Parses a JSON-like array, normalizing single quotes to double quotes
/// first. Anything that does not decode to an array is a fallback.
pub fn parse_loose_array(payload: &str) -> Extraction {
    let normalized = payload.replace('\'', "\"");
    match serde_json::from_str::<Value>(&normalized) {
        Ok(value @ Value::Array(_)) => Extraction::Parsed(value),
        _ => Extraction::Fallback(payload.to_string()),
    }
}

/// Folds a tag extraction into a name → description map. Malformed entries
/// are skipped; a fallback stores the raw text under [`RAW_TAGS_KEY`].
pub fn tags_to_metadata(extraction: &Extraction) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    match extraction {
        Extraction::Parsed(Value::Array(entries)) => {
            for entry in entries {
                let name = entry.get("Name").and_then(Value::as_str);
                let description = entry.get("Description");
                if let (Some(name), Some(description)) = (name, description) {
                    metadata.insert(name.to_string(), description.clone());
                }
            }
        }
        Extraction::Parsed(_) => {}
        Extraction::Fallback(raw) => {
            metadata.insert(RAW_TAGS_KEY.to_string(), Value::String(raw.clone()));
        }
    }
    metadata
}

/// Flattens a checklist extraction into plain strings. Fallbacks and
/// non-array payloads yield an empty checklist.
pub fn checklist_strings(extraction: &Extraction) -> Vec<String> {
    match extraction {
        Extraction::Parsed(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_payload_with_json_tag() {
        let raw = "Here are the tags:\n```json\n[{\"Name\": \"Model\"}]\n```\nDone.";
        assert_eq!(fenced_payload(raw), "[{\"Name\": \"Model\"}]");
    }

    #[test]
    fn test_fenced_payload_without_tag() {
        let raw = "```\n[1, 2]\n```";
        assert_eq!(fenced_payload(raw), "[1, 2]");
    }

    #[test]
    fn test_fenced_payload_first_block_wins() {
        let raw = "```\nfirst\n```\ntext\n```\nsecond\n```";
        assert_eq!(fenced_payload(raw), "first");
    }

    #[test]
    fn test_fenced_payload_no_fence_uses_trimmed_body() {
        let raw = "  [\"a\", \"b\"]  ";
        assert_eq!(fenced_payload(raw), "[\"a\", \"b\"]");
    }

    #[test]
    fn test_parse_loose_array_normalizes_single_quotes() {
        let extraction = parse_loose_array("[{'Name': 'Model', 'Description': 'MAX5033A'}]");
        assert_eq!(
            extraction,
            Extraction::Parsed(json!([{"Name": "Model", "Description": "MAX5033A"}]))
        );
    }

    #[test]
    fn test_parse_loose_array_malformed_falls_back() {
        let extraction = parse_loose_array("not json at all");
        assert_eq!(
            extraction,
            Extraction::Fallback("not json at all".to_string())
        );
    }

    #[test]
    fn test_parse_loose_array_non_array_falls_back() {
        let extraction = parse_loose_array("{\"Name\": \"Model\"}");
        assert!(extraction.is_fallback());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let input = "[{'Name': 'Model', 'Description': 'LM317'}]";
        assert_eq!(parse_loose_array(input), parse_loose_array(input));

        let first = tags_to_metadata(&parse_loose_array(input));
        let second = tags_to_metadata(&parse_loose_array(input));
        assert_eq!(first, second);
    }

    #[test]
    fn test_tags_fold_skips_malformed_entries() {
        let extraction = parse_loose_array(
            "[{'Name': 'Model', 'Description': 'MAX5033A'}, {'Name': 'incomplete'}, 42]",
        );
        let metadata = tags_to_metadata(&extraction);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("Model"), Some(&json!("MAX5033A")));
    }

    #[test]
    fn test_tags_fallback_stores_raw_text() {
        let metadata = tags_to_metadata(&Extraction::Fallback("garbled { output".to_string()));
        assert_eq!(
            metadata.get(RAW_TAGS_KEY),
            Some(&Value::String("garbled { output".to_string()))
        );
    }

    #[test]
    fn test_checklist_strings_from_array() {
        let extraction =
            parse_loose_array("['Verify VIN decoupling', 'Verify LX inductor rating']");
        let items = checklist_strings(&extraction);
        assert_eq!(
            items,
            vec![
                "Verify VIN decoupling".to_string(),
                "Verify LX inductor rating".to_string()
            ]
        );
    }

    #[test]
    fn test_checklist_stringifies_non_string_items() {
        let extraction = parse_loose_array("[\"check\", 7]");
        let items = checklist_strings(&extraction);
        assert_eq!(items, vec!["check".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_checklist_fallback_is_empty() {
        let items = checklist_strings(&Extraction::Fallback("no list here".to_string()));
        assert!(items.is_empty());
    }

    #[test]
    fn test_end_to_end_tag_reply() {
        let reply = "Sure, here are the tags:\n```json\n[\n  {'Name' : 'Model', 'Description' : 'MAX5033A'},\n  {'Name' : 'Input voltage', 'Description' : '7.5V to 76V'}\n]\n```";
        let metadata = tags_to_metadata(&parse_loose_array(&fenced_payload(reply)));
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("Input voltage"), Some(&json!("7.5V to 76V")));
    }
}
