// Snippet model - a stored text unit addressed by its path
// The id is informational; the path is the identity

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Snippet file contents (`*.json` under the snippet root). Files written by
/// older or foreign tools load as long as they are a JSON object; odd
/// values in any field never hide the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub modified: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    /// Informational; kept exactly as found
    #[serde(default = "default_version")]
    pub version: Value,
}

fn default_version() -> Value {
    Value::from(1)
}

/// Strings as-is, null as empty, anything else in its JSON form
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// An array keeps its string items, a lone string becomes one tag
fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

impl Snippet {
    pub fn new(id: String, title: String, text: String) -> Self {
        let now = super::nowIso();
        Self {
            id,
            text,
            tags: Vec::new(),
            created: now.clone(),
            modified: now,
            title,
            description: String::new(),
            category: String::new(),
            version: default_version(),
        }
    }

    /// Build a snippet from a plain `*.txt` file body.
    pub fn fromPlainText(title: &str, body: &str) -> Self {
        Self {
            id: String::new(),
            text: body.to_string(),
            tags: Vec::new(),
            created: String::new(),
            modified: String::new(),
            title: title.to_string(),
            description: String::new(),
            category: String::new(),
            version: default_version(),
        }
    }

    pub fn touch(&mut self) {
        self.modified = super::nowIso();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let snippet: Snippet = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(snippet.text, "hello");
        assert_eq!(snippet.version, Value::from(1));
        assert!(snippet.tags.is_empty());
    }

    #[test]
    fn test_foreign_field_types_still_load_text() {
        let raw = r#"{"id":7,"text":"hello","tags":["a",3,"b"],"version":"1.0","created":null,"title":{"x":1}}"#;
        let snippet: Snippet = serde_json::from_str(raw).unwrap();
        assert_eq!(snippet.text, "hello");
        assert_eq!(snippet.id, "7");
        assert_eq!(snippet.tags, vec!["a", "b"]);
        assert_eq!(snippet.version, Value::from("1.0"));
        assert_eq!(snippet.created, "");

        // Written back unchanged
        let json = serde_json::to_value(&snippet).unwrap();
        assert_eq!(json["version"], "1.0");
    }
}
