//! The subjects payload: free text or structured grades.
//!
//! Callers submit subjects as text. Text holding a JSON object is kept as
//! structured data, anything else is kept verbatim as raw text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subjects attached to a diploma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Subjects {
    /// Free text, passed through unchanged.
    RawText(String),
    /// A JSON object of subject name to grade (or any structured value).
    Structured(Map<String, Value>),
}

impl Subjects {
    /// Parse-or-wrap: a JSON object becomes `Structured`, everything else
    /// (including JSON arrays and scalars) stays `RawText`.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Subjects::Structured(map),
            _ => Subjects::RawText(text.to_string()),
        }
    }

    /// The grades object mirrored to the ledger.
    ///
    /// Raw text is wrapped as `{"subjects": <text>}`.
    pub fn to_grades(&self) -> Map<String, Value> {
        match self {
            Subjects::Structured(map) => map.clone(),
            Subjects::RawText(text) => {
                let mut map = Map::new();
                map.insert("subjects".to_string(), Value::String(text.clone()));
                map
            }
        }
    }

    /// The text form, as originally submitted for raw text and as compact
    /// JSON for structured data.
    pub fn to_text(&self) -> String {
        match self {
            Subjects::RawText(text) => text.clone(),
            Subjects::Structured(map) => Value::Object(map.clone()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_is_structured() {
        let subjects = Subjects::parse(r#"{"Mathematics": 10, "Physics": "9"}"#);
        match &subjects {
            Subjects::Structured(map) => {
                assert_eq!(map.get("Mathematics"), Some(&Value::from(10)));
                assert_eq!(map.get("Physics"), Some(&Value::from("9")));
            }
            other => panic!("expected structured subjects, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_is_raw() {
        let subjects = Subjects::parse("Mathematics, Physics");
        assert_eq!(subjects, Subjects::RawText("Mathematics, Physics".into()));
    }

    #[test]
    fn test_parse_array_is_raw() {
        assert!(matches!(Subjects::parse("[1, 2]"), Subjects::RawText(_)));
        assert!(matches!(Subjects::parse("42"), Subjects::RawText(_)));
    }

    #[test]
    fn test_raw_text_wrapped_for_grades() {
        let grades = Subjects::RawText("Algebra".into()).to_grades();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades.get("subjects"), Some(&Value::from("Algebra")));
    }

    #[test]
    fn test_structured_text_is_json() {
        let subjects = Subjects::parse(r#"{"Algebra":10}"#);
        assert_eq!(subjects.to_text(), r#"{"Algebra":10}"#);
    }
}
