//! Property tests for patch operations.

use automaton_patch::{PatchError, PatchOperation};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn flat_doc() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]", any::<i64>(), 0..4).prop_map(|entries| {
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        Value::Object(map)
    })
}

proptest! {
    #[test]
    fn add_lands_under_the_unescaped_key(key in "[a-z~/]{1,8}", value in any::<i64>()) {
        let op = PatchOperation::add(&format!("/{}", escape(&key)), value).unwrap();
        let patched = op.applied_to(&json!({})).unwrap();
        prop_assert_eq!(patched.get(&key), Some(&json!(value)));
        prop_assert_eq!(op.path(), format!("/{}", escape(&key)));
    }

    #[test]
    fn failing_operations_leave_the_document_unchanged(doc in flat_doc(), key in "[a-f]") {
        let ops = [
            PatchOperation::remove(&format!("/{}", key)).unwrap(),
            PatchOperation::replace(&format!("/{}", key), "x").unwrap(),
            PatchOperation::move_value(&format!("/{}", key), "/moved").unwrap(),
            PatchOperation::test(&format!("/{}", key), "never-an-integer").unwrap(),
        ];
        for op in ops {
            let mut value = doc.clone();
            match op.apply(&mut value) {
                Ok(()) => prop_assert!(doc.get(&key).is_some()),
                Err(PatchError::Failed { .. }) => prop_assert_eq!(&value, &doc),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn display_parses_back(key in "[a-z~/]{0,8}", value in any::<i32>()) {
        let op = PatchOperation::replace(&format!("/{}", escape(&key)), value).unwrap();
        let parsed: PatchOperation = serde_json::from_str(&op.to_string()).unwrap();
        prop_assert_eq!(parsed, op);
    }
}
