//! Field transform sentinels.
//!
//! A [`FieldValue`] is placed inside a document payload in place of a literal
//! value. The document helpers route it either into the document mask
//! (deletes) or into the document transform (everything else), validate its
//! payload and encode it as a `FieldTransform` wire instruction.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::error;

use crate::{
    encoder::{ArrayValue, EncodedValue, ValueEncoder},
    validator::{
        invalid_argument_message, validate_number, validate_user_input, ArgumentLabel,
        ValidationOptions, MAX_DEPTH,
    },
    value::Value,
    FieldTransformError, Result,
};

static DELETE_SENTINEL: Lazy<FieldValue> =
    Lazy::new(|| FieldValue(Arc::new(FieldTransform::Delete)));

static SERVER_TIMESTAMP_SENTINEL: Lazy<FieldValue> =
    Lazy::new(|| FieldValue(Arc::new(FieldTransform::ServerTimestamp)));

/// The closed set of transform kinds.
#[derive(Debug, Clone)]
pub enum FieldTransform {
    Delete,
    ServerTimestamp,
    NumericIncrement(Value),
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
}

impl FieldTransform {
    /// Whether the field path is listed in the document mask.
    pub fn include_in_document_mask(&self) -> bool {
        match self {
            FieldTransform::Delete => true,
            FieldTransform::ServerTimestamp
            | FieldTransform::NumericIncrement(_)
            | FieldTransform::ArrayUnion(_)
            | FieldTransform::ArrayRemove(_) => false,
        }
    }

    /// Whether the field is sent as a server-side transform instruction.
    pub fn include_in_document_transform(&self) -> bool {
        match self {
            FieldTransform::Delete => false,
            FieldTransform::ServerTimestamp
            | FieldTransform::NumericIncrement(_)
            | FieldTransform::ArrayUnion(_)
            | FieldTransform::ArrayRemove(_) => true,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            FieldTransform::Delete => "FieldValue.delete",
            FieldTransform::ServerTimestamp => "FieldValue.serverTimestamp",
            FieldTransform::NumericIncrement(_) => "FieldValue.increment",
            FieldTransform::ArrayUnion(_) => "FieldValue.arrayUnion",
            FieldTransform::ArrayRemove(_) => "FieldValue.arrayRemove",
        }
    }

    /// Validates the payload. Deletes and server timestamps carry none.
    pub fn validate(&self, allow_undefined: bool) -> Result<()> {
        self.validate_with_max_depth(allow_undefined, MAX_DEPTH)
    }

    /// Like [`FieldTransform::validate`], with array elements limited to
    /// `max_depth` levels of nesting.
    pub fn validate_with_max_depth(&self, allow_undefined: bool, max_depth: usize) -> Result<()> {
        match self {
            FieldTransform::Delete | FieldTransform::ServerTimestamp => Ok(()),
            FieldTransform::NumericIncrement(operand) => {
                validate_number(&ArgumentLabel::from("FieldValue.increment()"), operand)
            }
            FieldTransform::ArrayUnion(elements) | FieldTransform::ArrayRemove(elements) => {
                for (index, element) in elements.iter().enumerate() {
                    validate_array_element(index, element, allow_undefined, max_depth)?;
                }
                Ok(())
            }
        }
    }

    /// Encodes the transform for `field_path`, which must already be escaped.
    ///
    /// Deletes belong in the document mask and fail with
    /// [`FieldTransformError::InvariantViolation`].
    pub fn to_proto(
        &self,
        encoder: &dyn ValueEncoder,
        field_path: &str,
    ) -> Result<FieldTransformProto> {
        let transform_type = match self {
            FieldTransform::Delete => {
                error!(field_path, "attempted to encode a delete sentinel as a field transform");
                return Err(FieldTransformError::InvariantViolation {
                    message: format!(
                        "FieldValue.delete() should not be included in a FieldTransform (field \"{field_path}\")"
                    ),
                });
            }
            FieldTransform::ServerTimestamp => {
                TransformType::SetToServerValue(ServerValue::RequestTime)
            }
            FieldTransform::NumericIncrement(operand) => {
                TransformType::Increment(encoder.encode_value(operand)?)
            }
            FieldTransform::ArrayUnion(elements) => {
                TransformType::AppendMissingElements(encode_elements(encoder, elements)?)
            }
            FieldTransform::ArrayRemove(elements) => {
                TransformType::RemoveAllFromArray(encode_elements(encoder, elements)?)
            }
        };

        Ok(FieldTransformProto {
            field_path: field_path.to_string(),
            transform_type,
        })
    }
}

fn encode_elements(encoder: &dyn ValueEncoder, elements: &[Value]) -> Result<ArrayValue> {
    match encoder.encode_value(&Value::Array(elements.to_vec()))? {
        EncodedValue::ArrayValue(array) => Ok(array),
        other => Err(FieldTransformError::InvariantViolation {
            message: format!("expected an encoded array value, got {other:?}"),
        }),
    }
}

/// Validates one element of an array union/remove.
fn validate_array_element(
    index: usize,
    element: &Value,
    allow_undefined: bool,
    max_depth: usize,
) -> Result<()> {
    let arg = ArgumentLabel::from(index);
    if matches!(element, Value::Array(_)) {
        return Err(FieldTransformError::validation(
            format!(
                "{} Nested arrays are not supported.",
                invalid_argument_message(&arg, "array element")
            ),
            None,
        ));
    }

    validate_user_input(
        &arg,
        element,
        "array element",
        &ValidationOptions::for_array_element(allow_undefined, max_depth),
        None,
        0,
        true,
    )
}

/// A sentinel handle. Obtain one through the named constructors.
#[derive(Clone)]
pub struct FieldValue(Arc<FieldTransform>);

impl FieldValue {
    /// The shared delete sentinel.
    pub fn delete() -> Self {
        DELETE_SENTINEL.clone()
    }

    /// The shared server-timestamp sentinel.
    pub fn server_timestamp() -> Self {
        SERVER_TIMESTAMP_SENTINEL.clone()
    }

    /// Increments the field by `operand`. The operand is checked by
    /// [`FieldValue::validate`], not here.
    pub fn increment(operand: impl Into<Value>) -> Self {
        Self(Arc::new(FieldTransform::NumericIncrement(operand.into())))
    }

    /// Dynamic-arity form of [`FieldValue::increment`].
    pub fn increment_with<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut args = args.into_iter();
        let operand = args.next().ok_or_else(|| {
            FieldTransformError::argument(
                "Function \"FieldValue.increment()\" requires at least 1 argument.",
            )
        })?;
        if args.next().is_some() {
            return Err(FieldTransformError::argument(
                "Function \"FieldValue.increment()\" accepts exactly 1 argument.",
            ));
        }
        Ok(Self::increment(operand))
    }

    /// Adds each element that is not already present.
    pub fn array_union<I, T>(elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let elements = collect_elements("FieldValue.arrayUnion", elements)?;
        Ok(Self(Arc::new(FieldTransform::ArrayUnion(elements))))
    }

    /// Removes all instances of each element.
    pub fn array_remove<I, T>(elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let elements = collect_elements("FieldValue.arrayRemove", elements)?;
        Ok(Self(Arc::new(FieldTransform::ArrayRemove(elements))))
    }

    pub fn transform(&self) -> &FieldTransform {
        &self.0
    }

    pub fn include_in_document_mask(&self) -> bool {
        self.0.include_in_document_mask()
    }

    pub fn include_in_document_transform(&self) -> bool {
        self.0.include_in_document_transform()
    }

    pub fn method_name(&self) -> &'static str {
        self.0.method_name()
    }

    pub fn validate(&self, allow_undefined: bool) -> Result<()> {
        self.0.validate(allow_undefined)
    }

    pub fn validate_with_max_depth(&self, allow_undefined: bool, max_depth: usize) -> Result<()> {
        self.0.validate_with_max_depth(allow_undefined, max_depth)
    }

    pub fn to_proto(
        &self,
        encoder: &dyn ValueEncoder,
        field_path: &str,
    ) -> Result<FieldTransformProto> {
        self.0.to_proto(encoder, field_path)
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &FieldValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity for the singletons, structural equality for the rest.
    pub fn is_equal(&self, other: &FieldValue) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.transform(), other.transform()) {
            (FieldTransform::NumericIncrement(a), FieldTransform::NumericIncrement(b)) => a == b,
            (FieldTransform::ArrayUnion(a), FieldTransform::ArrayUnion(b))
            | (FieldTransform::ArrayRemove(a), FieldTransform::ArrayRemove(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transform() {
            FieldTransform::Delete | FieldTransform::ServerTimestamp => {
                write!(f, "{}()", self.method_name())
            }
            FieldTransform::NumericIncrement(operand) => {
                write!(f, "{}({operand:?})", self.method_name())
            }
            FieldTransform::ArrayUnion(elements) | FieldTransform::ArrayRemove(elements) => {
                write!(f, "{}({elements:?})", self.method_name())
            }
        }
    }
}

fn collect_elements<I, T>(method_name: &str, elements: I) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = T>,
    T: Into<Value>,
{
    let elements: Vec<Value> = elements.into_iter().map(Into::into).collect();
    if elements.is_empty() {
        return Err(FieldTransformError::argument(format!(
            "Function \"{method_name}()\" requires at least 1 argument."
        )));
    }
    Ok(elements)
}

/// A single `FieldTransform` wire instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransformProto {
    pub field_path: String,
    #[serde(flatten)]
    pub transform_type: TransformType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformType {
    SetToServerValue(ServerValue),
    Increment(EncodedValue),
    AppendMissingElements(ArrayValue),
    RemoveAllFromArray(ArrayValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerValue {
    RequestTime,
}
