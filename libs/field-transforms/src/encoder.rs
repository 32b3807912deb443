use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::SecondsFormat;
use serde::{Serialize, Serializer};

use crate::{
    value::{Timestamp, Value},
    FieldTransformError, Result,
};

/// Converts user values into their wire representation.
pub trait ValueEncoder {
    fn encode_value(&self, value: &Value) -> Result<EncodedValue>;
}

/// Firestore value in proto3-JSON form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EncodedValue {
    NullValue(NullValue),
    BooleanValue(bool),
    IntegerValue(#[serde(serialize_with = "serialize_integer")] i64),
    DoubleValue(#[serde(serialize_with = "serialize_double")] f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullValue {
    NullValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArrayValue {
    pub values: Vec<EncodedValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapValue {
    pub fields: BTreeMap<String, EncodedValue>,
}

// proto3 JSON carries int64 as a decimal string.
fn serialize_integer<S: Serializer>(value: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn serialize_double<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Default encoder producing proto3-JSON values.
///
/// `Undefined` entries and sentinels nested inside arrays or maps are
/// skipped; the document helpers route sentinels separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoEncoder;

impl ProtoEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes the literal fields of a document.
    pub fn encode_fields(&self, fields: &BTreeMap<String, Value>) -> Result<MapValue> {
        let mut encoded = BTreeMap::new();
        for (key, value) in fields {
            if let Some(value) = self.encode_nested(value)? {
                encoded.insert(key.clone(), value);
            }
        }
        Ok(MapValue { fields: encoded })
    }

    fn encode_nested(&self, value: &Value) -> Result<Option<EncodedValue>> {
        match value {
            Value::Undefined | Value::Sentinel(_) => Ok(None),
            other => self.encode_value(other).map(Some),
        }
    }
}

impl ValueEncoder for ProtoEncoder {
    fn encode_value(&self, value: &Value) -> Result<EncodedValue> {
        let encoded = match value {
            Value::Null => EncodedValue::NullValue(NullValue::NullValue),
            Value::Boolean(flag) => EncodedValue::BooleanValue(*flag),
            Value::Integer(integer) => EncodedValue::IntegerValue(*integer),
            Value::Double(double) => EncodedValue::DoubleValue(*double),
            Value::String(text) => EncodedValue::StringValue(text.clone()),
            Value::Bytes(bytes) => EncodedValue::BytesValue(STANDARD.encode(bytes)),
            Value::Timestamp(timestamp) => EncodedValue::TimestampValue(format_timestamp(timestamp)?),
            Value::GeoPoint(point) => EncodedValue::GeoPointValue(LatLng {
                latitude: point.latitude(),
                longitude: point.longitude(),
            }),
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(encoded) = self.encode_nested(item)? {
                        values.push(encoded);
                    }
                }
                EncodedValue::ArrayValue(ArrayValue { values })
            }
            Value::Map(fields) => EncodedValue::MapValue(self.encode_fields(fields)?),
            Value::Undefined => {
                return Err(FieldTransformError::EncodingError {
                    message: "\"undefined\" cannot be encoded as a Firestore value".into(),
                })
            }
            Value::Sentinel(field_value) => {
                return Err(FieldTransformError::EncodingError {
                    message: format!(
                        "{}() cannot be encoded as a literal value",
                        field_value.method_name()
                    ),
                })
            }
        };
        Ok(encoded)
    }
}

fn format_timestamp(timestamp: &Timestamp) -> Result<String> {
    let datetime = timestamp
        .to_datetime()
        .ok_or_else(|| FieldTransformError::EncodingError {
            message: format!(
                "timestamp {}s {}ns is outside the supported range",
                timestamp.seconds(),
                timestamp.nanos()
            ),
        })?;
    Ok(datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::FieldValue;
    use crate::value::GeoPoint;
    use serde_json::json;

    fn encode_json(value: &Value) -> serde_json::Value {
        let encoded = ProtoEncoder::new().encode_value(value).unwrap();
        serde_json::to_value(encoded).unwrap()
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_json(&Value::Null), json!({"nullValue": "NULL_VALUE"}));
        assert_eq!(encode_json(&Value::from(true)), json!({"booleanValue": true}));
        assert_eq!(encode_json(&Value::from(5)), json!({"integerValue": "5"}));
        assert_eq!(encode_json(&Value::from(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_json(&Value::from("x")), json!({"stringValue": "x"}));
    }

    #[test]
    fn test_encode_non_finite_doubles() {
        assert_eq!(encode_json(&Value::from(f64::NAN)), json!({"doubleValue": "NaN"}));
        assert_eq!(
            encode_json(&Value::from(f64::NEG_INFINITY)),
            json!({"doubleValue": "-Infinity"})
        );
    }

    #[test]
    fn test_encode_bytes_as_base64() {
        assert_eq!(
            encode_json(&Value::bytes(vec![1u8, 2, 3])),
            json!({"bytesValue": "AQID"})
        );
    }

    #[test]
    fn test_encode_timestamp() {
        let timestamp = Timestamp::new(0, 500_000_000).unwrap();
        assert_eq!(
            encode_json(&Value::from(timestamp)),
            json!({"timestampValue": "1970-01-01T00:00:00.500Z"})
        );
    }

    #[test]
    fn test_encode_geo_point() {
        let point = GeoPoint::new(1.5, -2.0).unwrap();
        assert_eq!(
            encode_json(&Value::from(point)),
            json!({"geoPointValue": {"latitude": 1.5, "longitude": -2.0}})
        );
    }

    #[test]
    fn test_nested_undefined_and_sentinels_are_skipped() {
        let value = Value::map([
            ("a", Value::from(1)),
            ("b", Value::Undefined),
            ("c", Value::from(FieldValue::server_timestamp())),
            (
                "d",
                Value::from(vec![Value::from("x"), Value::Undefined]),
            ),
        ]);
        assert_eq!(
            encode_json(&value),
            json!({"mapValue": {"fields": {
                "a": {"integerValue": "1"},
                "d": {"arrayValue": {"values": [{"stringValue": "x"}]}}
            }}})
        );
    }

    #[test]
    fn test_top_level_undefined_is_rejected() {
        let err = ProtoEncoder::new().encode_value(&Value::Undefined).unwrap_err();
        assert!(matches!(err, FieldTransformError::EncodingError { .. }));
    }

    #[test]
    fn test_top_level_sentinel_is_rejected() {
        let err = ProtoEncoder::new()
            .encode_value(&Value::from(FieldValue::delete()))
            .unwrap_err();
        assert!(err.to_string().contains("FieldValue.delete()"));
    }
}
