//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use diploma_registry_core::OwnerAddress;

/// A student index drawn from a pool of `pool` values, so that generated
/// operations collide on the same index.
pub fn student_index(pool: usize) -> impl Strategy<Value = String> {
    (0..pool.max(1)).prop_map(|i| format!("20{:04}", i))
}

/// A wallet address in mixed-case hex.
pub fn owner_address() -> impl Strategy<Value = String> {
    "0x[0-9a-fA-F]{40}".prop_map(String::from)
}

/// A structured subjects object rendered as JSON text.
pub fn structured_subjects() -> impl Strategy<Value = String> {
    prop::collection::btree_map("[A-Z][a-z]{2,12}", 5u8..=10, 1..6).prop_map(|grades| {
        let map: Map<String, Value> = grades
            .into_iter()
            .map(|(subject, grade)| (subject, Value::from(grade)))
            .collect();
        Value::Object(map).to_string()
    })
}

/// Subjects text as callers submit it: a JSON object or free text.
pub fn subjects_text() -> impl Strategy<Value = String> {
    prop_oneof![
        structured_subjects(),
        "[A-Za-z ,;]{0,40}".prop_map(String::from),
        Just("[\"Algebra\", \"Physics\"]".to_string()),
        Just("42".to_string()),
    ]
}

/// One call against the registry.
///
/// Targets are positions into the identifiers created so far, wrapped
/// modulo their count.
#[derive(Debug, Clone)]
pub enum Op {
    Create {
        index: String,
        owner: Option<String>,
    },
    Validate(usize),
    Invalidate(usize),
    Delete(usize),
}

/// A single operation over a pool of indices.
pub fn op(pool: usize, with_delete: bool) -> BoxedStrategy<Op> {
    let create = (student_index(pool), proptest::option::of(owner_address()))
        .prop_map(|(index, owner)| Op::Create { index, owner });

    if with_delete {
        prop_oneof![
            4 => create,
            2 => any::<usize>().prop_map(Op::Validate),
            2 => any::<usize>().prop_map(Op::Invalidate),
            1 => any::<usize>().prop_map(Op::Delete),
        ]
        .boxed()
    } else {
        prop_oneof![
            4 => create,
            2 => any::<usize>().prop_map(Op::Validate),
            2 => any::<usize>().prop_map(Op::Invalidate),
        ]
        .boxed()
    }
}

/// A sequence of up to `max_len` operations.
pub fn ops(pool: usize, max_len: usize, with_delete: bool) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(pool, with_delete), 1..=max_len)
}

/// Normalized form of a generated address.
pub fn normalized(address: &str) -> OwnerAddress {
    OwnerAddress::new(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diploma_registry_core::Subjects;

    proptest! {
        #[test]
        fn test_subjects_parse_or_wrap(text in subjects_text()) {
            let parsed = Subjects::parse(&text);
            let is_object = matches!(
                serde_json::from_str::<Value>(&text),
                Ok(Value::Object(_))
            );

            match &parsed {
                Subjects::Structured(_) => prop_assert!(is_object),
                Subjects::RawText(raw) => {
                    prop_assert!(!is_object);
                    prop_assert_eq!(raw, &text);
                    let grades = parsed.to_grades();
                    prop_assert_eq!(
                        grades.get("subjects"),
                        Some(&Value::String(text.clone()))
                    );
                }
            }
        }

        #[test]
        fn test_structured_subjects_keep_grades(text in structured_subjects()) {
            let parsed = Subjects::parse(&text);
            let expected: Map<String, Value> = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(parsed.to_grades(), expected);
        }

        #[test]
        fn test_owner_normalization_idempotent(address in owner_address()) {
            let once = normalized(&address);
            let twice = normalized(once.as_str());
            prop_assert_eq!(once.as_str(), address.to_lowercase());
            prop_assert_eq!(once, twice);
        }
    }
}
