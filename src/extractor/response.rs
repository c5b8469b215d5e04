//! Model response cleanup
//!
//! Reasoning models wrap their deliberation in `<think>` blocks, and most
//! models add prose or code fences around the JSON they were asked for.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Failure to recover a JSON object from a response
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("No JSON object in model response")]
    NoJsonObject,

    #[error("Invalid JSON in model response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

fn reasoning_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<think>.*?</think>").expect("reasoning pattern is a valid regex")
    })
}

/// Removes every `<think>...</think>` block and surrounding whitespace
pub fn strip_reasoning(response: &str) -> String {
    reasoning_block().replace_all(response, "").trim().to_string()
}

/// Parses the span from the first `{` to the last `}`
///
/// Tolerates any prose before or after the object.
pub fn locate_json_object(text: &str) -> Result<Value, ResponseError> {
    let start = text.find('{').ok_or(ResponseError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ResponseError::NoJsonObject)?;
    if end < start {
        return Err(ResponseError::NoJsonObject);
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_reasoning() {
        let response = "<think>\nThe post mentions 6000...\n</think>\n{\"rent\": 1}";
        assert_eq!(strip_reasoning(response), "{\"rent\": 1}");
    }

    #[test]
    fn test_strip_multiple_reasoning_blocks() {
        let response = "<think>a</think>{\"a\": 1}<think>b</think>";
        assert_eq!(strip_reasoning(response), "{\"a\": 1}");
    }

    #[test]
    fn test_locate_object_in_prose() {
        let text = concat!(
            "Here is the listing:\n```json\n",
            "{\"address\": \"x\", \"rent\": {\"min\": 1}}\n",
            "```\nHope it helps!"
        );
        assert_eq!(
            locate_json_object(text).unwrap(),
            json!({ "address": "x", "rent": { "min": 1 } })
        );
    }

    #[test]
    fn test_no_braces() {
        assert!(matches!(
            locate_json_object("I could not parse this post."),
            Err(ResponseError::NoJsonObject)
        ));
    }

    #[test]
    fn test_reversed_braces() {
        assert!(matches!(
            locate_json_object("} nothing here {"),
            Err(ResponseError::NoJsonObject)
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            locate_json_object("{\"address\": }"),
            Err(ResponseError::InvalidJson(_))
        ));
    }
}
