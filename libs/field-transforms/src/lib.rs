//! Firestore field transforms.
//!
//! This crate models the sentinel values a caller can place inside a document
//! payload to request server-side mutations instead of literal writes: field
//! deletes, server timestamps, numeric increments and array union/remove. It
//! classifies each sentinel into the document mask or the document transform,
//! validates sentinel payloads (recursively for array elements) and encodes
//! them into Firestore's proto3-JSON wire shapes.

use thiserror::Error;

// Module declarations
pub mod config;
pub mod document;
pub mod encoder;
pub mod path;
pub mod transform;
pub mod validator;
pub mod value;

// Re-export key types
pub use config::SerializerSettings;
pub use document::{validate_document, DocumentMask, DocumentMaskProto, DocumentTransform};
pub use encoder::{ArrayValue, EncodedValue, LatLng, MapValue, NullValue, ProtoEncoder, ValueEncoder};
pub use path::FieldPath;
pub use transform::{FieldTransform, FieldTransformProto, FieldValue, ServerValue, TransformType};
pub use validator::{validate_user_input, AllowDeletes, ArgumentLabel, ValidationOptions};
pub use value::{GeoPoint, Timestamp, Value};

/// Errors emitted while building, validating or encoding field transforms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldTransformError {
    /// A factory or constructor was called with the wrong arguments.
    #[error("Argument error: {message}")]
    ArgumentError { message: String },

    /// A transform payload or user value failed validation.
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field_path: Option<String>,
    },

    /// The caller broke an internal contract, e.g. by encoding a delete.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// The value cannot be represented on the wire.
    #[error("Encoding error: {message}")]
    EncodingError { message: String },
}

impl FieldTransformError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::ArgumentError {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>, field_path: Option<&FieldPath>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field_path: field_path.map(FieldPath::formatted_name),
        }
    }

    /// Returns the formatted field path attached to a validation error.
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field_path, .. } => field_path.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldTransformError>;
