//! Sentinel construction, equality, validation and encoding tests

use firestore_field_transforms::{
    FieldTransform, FieldTransformError, FieldValue, ProtoEncoder, Value,
};
use serde_json::json;

fn encode(field_value: &FieldValue, path: &str) -> serde_json::Value {
    let proto = field_value
        .to_proto(&ProtoEncoder::new(), path)
        .expect("transform encodes");
    serde_json::to_value(proto).expect("proto serializes")
}

#[test]
fn test_delete_is_a_singleton() {
    let a = FieldValue::delete();
    let b = FieldValue::delete();
    assert!(a.ptr_eq(&b));
    assert!(a.is_equal(&b));
}

#[test]
fn test_server_timestamp_is_a_singleton() {
    let a = FieldValue::server_timestamp();
    let b = FieldValue::server_timestamp();
    assert!(a.ptr_eq(&b));
    assert_eq!(a, b);
}

#[test]
fn test_delete_never_equals_server_timestamp() {
    assert!(!FieldValue::delete().is_equal(&FieldValue::server_timestamp()));
    assert!(!FieldValue::server_timestamp().is_equal(&FieldValue::delete()));
}

#[test]
fn test_singletons_are_shared_across_threads() {
    let handle = std::thread::spawn(FieldValue::delete);
    let from_thread = handle.join().expect("thread completes");
    assert!(from_thread.ptr_eq(&FieldValue::delete()));
}

#[test]
fn test_increment_equality() {
    assert_eq!(FieldValue::increment(1), FieldValue::increment(1.0));
    assert_ne!(FieldValue::increment(1), FieldValue::increment(2));
    assert_eq!(FieldValue::increment(0), FieldValue::increment(-0.0));
    assert_eq!(FieldValue::increment(0.0), FieldValue::increment(-0.0));
}

#[test]
fn test_increment_is_not_equal_to_other_kinds() {
    let union = FieldValue::array_union(vec![1]).unwrap();
    assert_ne!(FieldValue::increment(1), union);
    assert_ne!(FieldValue::increment(1), FieldValue::server_timestamp());
}

#[test]
fn test_array_union_equality_is_order_sensitive() {
    let a = FieldValue::array_union(vec![1, 2]).unwrap();
    let b = FieldValue::array_union(vec![1, 2]).unwrap();
    let reversed = FieldValue::array_union(vec![2, 1]).unwrap();
    assert!(!a.ptr_eq(&b));
    assert_eq!(a, b);
    assert_ne!(a, reversed);
}

#[test]
fn test_array_remove_deep_equality() {
    let nested = || Value::map([("k", Value::from(vec![Value::from("v")]))]);
    let a = FieldValue::array_remove(vec![nested(), Value::from(1)]).unwrap();
    let b = FieldValue::array_remove(vec![nested(), Value::from(1.0)]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_empty_array_transforms_are_argument_errors() {
    let union = FieldValue::array_union(Vec::<Value>::new()).unwrap_err();
    let remove = FieldValue::array_remove(Vec::<Value>::new()).unwrap_err();
    assert!(matches!(union, FieldTransformError::ArgumentError { .. }));
    assert!(matches!(remove, FieldTransformError::ArgumentError { .. }));
    assert!(union.to_string().contains("FieldValue.arrayUnion()"));
    assert!(remove.to_string().contains("FieldValue.arrayRemove()"));
}

#[test]
fn test_increment_without_operand_is_argument_error() {
    let err = FieldValue::increment_with(Vec::new()).unwrap_err();
    assert!(matches!(err, FieldTransformError::ArgumentError { .. }));
}

#[test]
fn test_increment_with_extra_operands_is_argument_error() {
    let err = FieldValue::increment_with(vec![Value::from(1), Value::from(2)]).unwrap_err();
    assert!(matches!(err, FieldTransformError::ArgumentError { .. }));
}

#[test]
fn test_increment_with_single_operand() {
    let value = FieldValue::increment_with(vec![Value::from(3)]).unwrap();
    assert_eq!(value, FieldValue::increment(3));
}

#[test]
fn test_nested_array_element_fails_validation() {
    let value = FieldValue::array_union(vec![Value::from(vec![1, 2])]).unwrap();
    let err = value.validate(false).unwrap_err();
    assert!(matches!(err, FieldTransformError::ValidationError { .. }));
    let message = err.to_string();
    assert!(message.contains("Element at index 0"), "{message}");
    assert!(message.contains("Nested arrays are not supported."), "{message}");
}

#[test]
fn test_first_failing_element_is_reported() {
    let value = FieldValue::array_remove(vec![
        Value::from("ok"),
        Value::from(vec![1]),
        Value::from(vec![2]),
    ])
    .unwrap();
    let err = value.validate(false).unwrap_err();
    assert!(err.to_string().contains("Element at index 1"));
}

#[test]
fn test_nested_arrays_rejected_even_when_undefined_is_allowed() {
    let value = FieldValue::array_union(vec![Value::from(vec!["a"])]).unwrap();
    assert!(value.validate(true).is_err());
}

#[test]
fn test_sentinel_element_fails_validation() {
    let value = FieldValue::array_union(vec![Value::from(FieldValue::server_timestamp())]).unwrap();
    let message = value.validate(false).unwrap_err().to_string();
    assert!(
        message.contains("FieldValue.serverTimestamp() cannot be used inside of an array"),
        "{message}"
    );
}

#[test]
fn test_delete_nested_in_element_fails_validation() {
    let element = Value::map([("gone", Value::from(FieldValue::delete()))]);
    let value = FieldValue::array_union(vec![element]).unwrap();
    let message = value.validate(false).unwrap_err().to_string();
    assert!(message.contains("FieldValue.delete() cannot be used inside of an array"), "{message}");
    assert!(message.contains("(found in field \"gone\")"), "{message}");
}

#[test]
fn test_undefined_element_follows_flag() {
    let nested = Value::map([("a", Value::Undefined)]);
    let value = FieldValue::array_union(vec![nested]).unwrap();
    assert!(value.validate(false).is_err());
    assert!(value.validate(true).is_ok());

    let top_level = FieldValue::array_union(vec![Value::Undefined]).unwrap();
    assert!(top_level.validate(true).is_err());
}

#[test]
fn test_array_element_depth_limit_is_configurable() {
    let element = Value::map([("a", Value::map([("b", Value::map([("c", 1)]))]))]);
    let value = FieldValue::array_remove(vec![element]).unwrap();
    assert!(value.validate(false).is_ok());
    assert!(value.validate_with_max_depth(false, 3).is_ok());

    let err = value.validate_with_max_depth(false, 2).unwrap_err();
    assert!(err
        .to_string()
        .contains("Element at index 0 is not a valid array element. Input object is deeper than 2 levels"));
}

#[test]
fn test_non_numeric_increment_fails_only_at_validation() {
    let value = FieldValue::increment("x");
    let err = value.validate(false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: Value for argument \"FieldValue.increment()\" is not a valid number."
    );
}

#[test]
fn test_numeric_increment_validates() {
    assert!(FieldValue::increment(5).validate(false).is_ok());
    assert!(FieldValue::increment(-2.5).validate(false).is_ok());
    assert!(FieldValue::increment(f64::NAN).validate(false).is_err());
}

#[test]
fn test_parameterless_sentinels_always_validate() {
    assert!(FieldValue::delete().validate(false).is_ok());
    assert!(FieldValue::server_timestamp().validate(false).is_ok());
}

#[test]
fn test_encode_server_timestamp() {
    assert_eq!(
        encode(&FieldValue::server_timestamp(), "a"),
        json!({"fieldPath": "a", "setToServerValue": "REQUEST_TIME"})
    );
}

#[test]
fn test_encode_increment() {
    assert_eq!(
        encode(&FieldValue::increment(5), "count"),
        json!({"fieldPath": "count", "increment": {"integerValue": "5"}})
    );
    assert_eq!(
        encode(&FieldValue::increment(0.5), "ratio"),
        json!({"fieldPath": "ratio", "increment": {"doubleValue": 0.5}})
    );
}

#[test]
fn test_encode_array_union() {
    let value = FieldValue::array_union(vec!["x"]).unwrap();
    assert_eq!(
        encode(&value, "tags"),
        json!({
            "fieldPath": "tags",
            "appendMissingElements": {"values": [{"stringValue": "x"}]}
        })
    );
}

#[test]
fn test_encode_array_remove() {
    let value = FieldValue::array_remove(vec!["x"]).unwrap();
    assert_eq!(
        encode(&value, "tags"),
        json!({
            "fieldPath": "tags",
            "removeAllFromArray": {"values": [{"stringValue": "x"}]}
        })
    );
}

#[test]
fn test_encode_uses_escaped_path_verbatim() {
    let proto = FieldValue::server_timestamp()
        .to_proto(&ProtoEncoder::new(), "meta.`last seen`")
        .unwrap();
    assert_eq!(proto.field_path, "meta.`last seen`");
}

#[test]
fn test_encoding_delete_is_invariant_violation() {
    let err = FieldValue::delete()
        .to_proto(&ProtoEncoder::new(), "a")
        .unwrap_err();
    assert!(matches!(err, FieldTransformError::InvariantViolation { .. }));
}

#[test]
fn test_classification_flags() {
    let cases = vec![
        (FieldValue::delete(), true, false),
        (FieldValue::server_timestamp(), false, true),
        (FieldValue::increment(1), false, true),
        (FieldValue::array_union(vec![1]).unwrap(), false, true),
        (FieldValue::array_remove(vec![1]).unwrap(), false, true),
    ];

    for (value, mask, transform) in cases {
        assert_eq!(value.include_in_document_mask(), mask, "{value:?}");
        assert_eq!(value.include_in_document_transform(), transform, "{value:?}");
    }
}

#[test]
fn test_transform_exposes_payload() {
    let value = FieldValue::array_union(vec![1, 2]).unwrap();
    match value.transform() {
        FieldTransform::ArrayUnion(elements) => assert_eq!(elements.len(), 2),
        other => panic!("unexpected transform {other:?}"),
    }
}
