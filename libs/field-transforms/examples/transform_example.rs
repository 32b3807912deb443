use std::collections::BTreeMap;

use firestore_field_transforms::{
    validate_document, DocumentMask, DocumentTransform, FieldTransformError, FieldValue,
    ProtoEncoder, SerializerSettings, ValidationOptions, Value,
};

fn main() {
    let settings = SerializerSettings::from_env().unwrap_or_default();
    let options = ValidationOptions::for_write(&settings);
    let encoder = ProtoEncoder::new();

    let mut document = BTreeMap::new();
    document.insert("name".to_string(), Value::from("sensor-7"));
    document.insert("readings".to_string(), Value::from(FieldValue::increment(1)));
    document.insert("lastSeen".to_string(), Value::from(FieldValue::server_timestamp()));
    document.insert("stale".to_string(), Value::from(FieldValue::delete()));

    match validate_document(&document, &options) {
        Ok(()) => {
            let mask = DocumentMask::from_object(&document);
            let transform = DocumentTransform::from_object(&document);
            println!("Mask: {:?}", mask.to_proto().field_paths);
            match transform.to_proto(&encoder) {
                Ok(protos) => println!(
                    "Transforms:\n{}",
                    serde_json::to_string_pretty(&protos).unwrap_or_default()
                ),
                Err(err) => println!("Encoding unexpectedly failed: {err}"),
            }
        }
        Err(err) => println!("Validation unexpectedly failed: {err}"),
    }

    match FieldValue::array_union(vec![Value::from(vec![1, 2])]) {
        Ok(nested) => match nested.validate(settings.ignore_undefined_properties) {
            Ok(()) => println!("Nested array example unexpectedly validated"),
            Err(FieldTransformError::ValidationError { message, .. }) => {
                println!("Validation error: {message}");
            }
            Err(err) => println!("Received different error: {err}"),
        },
        Err(err) => println!("Construction unexpectedly failed: {err}"),
    }

    match FieldValue::array_remove(Vec::<Value>::new()) {
        Ok(_) => println!("Empty arrayRemove unexpectedly constructed"),
        Err(FieldTransformError::ArgumentError { message }) => {
            println!("Argument error: {message}");
        }
        Err(err) => println!("Unexpected error: {err}"),
    }
}
