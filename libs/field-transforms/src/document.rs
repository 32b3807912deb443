use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::{
    config::SerializerSettings,
    encoder::ValueEncoder,
    path::FieldPath,
    transform::{FieldTransformProto, FieldValue},
    validator::{validate_user_input, ArgumentLabel, ValidationOptions},
    value::Value,
    FieldTransformError, Result,
};

/// Validates a whole document payload.
///
/// Each top-level field is checked at level 1 under its own single-segment
/// path, as if the document map itself sat at level 0.
pub fn validate_document(
    document: &BTreeMap<String, Value>,
    options: &ValidationOptions,
) -> Result<()> {
    let arg = ArgumentLabel::from("data");
    for (key, value) in document {
        validate_user_input(
            &arg,
            value,
            "Firestore document",
            options,
            Some(&FieldPath::from_segment(key.clone())),
            1,
            false,
        )?;
    }
    Ok(())
}

/// The field paths a write touches explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMask {
    field_paths: Vec<FieldPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMaskProto {
    pub field_paths: Vec<String>,
}

impl DocumentMask {
    pub fn from_object(document: &BTreeMap<String, Value>) -> Self {
        let mut field_paths = Vec::new();
        collect_mask_paths(document, None, &mut field_paths);
        Self { field_paths }
    }

    pub fn field_paths(&self) -> &[FieldPath] {
        &self.field_paths
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths.is_empty()
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.field_paths.contains(path)
    }

    pub fn to_proto(&self) -> DocumentMaskProto {
        DocumentMaskProto {
            field_paths: self
                .field_paths
                .iter()
                .map(FieldPath::formatted_name)
                .collect(),
        }
    }
}

fn collect_mask_paths(
    fields: &BTreeMap<String, Value>,
    parent: Option<&FieldPath>,
    out: &mut Vec<FieldPath>,
) {
    for (key, value) in fields {
        let path = match parent {
            Some(parent) => parent.append(key.clone()),
            None => FieldPath::from_segment(key.clone()),
        };
        match value {
            Value::Sentinel(field_value) => {
                if field_value.include_in_document_mask() {
                    out.push(path);
                }
            }
            Value::Map(nested) if !nested.is_empty() => {
                collect_mask_paths(nested, Some(&path), out);
            }
            // Ignored properties are not written.
            Value::Undefined => {}
            _ => out.push(path),
        }
    }
}

/// The server-side transforms requested by a document payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentTransform {
    transforms: Vec<(FieldPath, FieldValue)>,
}

impl DocumentTransform {
    /// Collects every sentinel that belongs in the transform list.
    ///
    /// Arrays are not searched; sentinels inside arrays are a validation
    /// error reported by [`validate_document`].
    pub fn from_object(document: &BTreeMap<String, Value>) -> Self {
        let mut transforms = Vec::new();
        collect_transforms(document, None, &mut transforms);
        debug!(transforms = transforms.len(), "extracted document transforms");
        Self { transforms }
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn field_paths(&self) -> Vec<&FieldPath> {
        self.transforms.iter().map(|(path, _)| path).collect()
    }

    pub fn transforms(&self) -> &[(FieldPath, FieldValue)] {
        &self.transforms
    }

    /// Validates each transform; the first failure is tagged with its path.
    pub fn validate(&self, settings: &SerializerSettings) -> Result<()> {
        for (path, field_value) in &self.transforms {
            field_value
                .validate_with_max_depth(settings.ignore_undefined_properties, settings.max_depth)
                .map_err(|err| match err {
                    // Paths inside an array element are relative to the element.
                    FieldTransformError::ValidationError { message, .. } => {
                        FieldTransformError::validation(
                            format!("{message} (found in field \"{path}\")"),
                            Some(path),
                        )
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    pub fn to_proto(&self, encoder: &dyn ValueEncoder) -> Result<Vec<FieldTransformProto>> {
        self.transforms
            .iter()
            .map(|(path, field_value)| field_value.to_proto(encoder, &path.formatted_name()))
            .collect()
    }
}

fn collect_transforms(
    fields: &BTreeMap<String, Value>,
    parent: Option<&FieldPath>,
    out: &mut Vec<(FieldPath, FieldValue)>,
) {
    for (key, value) in fields {
        let path = match parent {
            Some(parent) => parent.append(key.clone()),
            None => FieldPath::from_segment(key.clone()),
        };
        match value {
            Value::Sentinel(field_value) if field_value.include_in_document_transform() => {
                out.push((path, field_value.clone()));
            }
            Value::Map(nested) => collect_transforms(nested, Some(&path), out),
            _ => {}
        }
    }
}
