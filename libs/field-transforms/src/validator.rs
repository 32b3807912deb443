use std::fmt;

use tracing::trace;

use crate::{
    config::SerializerSettings,
    path::FieldPath,
    transform::{FieldTransform, FieldValue},
    value::Value,
    FieldTransformError, Result,
};

/// Maximum nesting depth accepted by default.
pub const MAX_DEPTH: usize = 20;

/// Where delete sentinels may appear in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowDeletes {
    /// Never.
    None,
    /// At the top level, or as the value of a single-segment field path.
    Root,
    /// Anywhere outside of arrays.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub allow_deletes: AllowDeletes,
    pub allow_transforms: bool,
    pub allow_undefined: bool,
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allow_deletes: AllowDeletes::None,
            allow_transforms: false,
            allow_undefined: false,
            max_depth: MAX_DEPTH,
        }
    }
}

impl ValidationOptions {
    /// Options for set/update payloads.
    pub fn for_write(settings: &SerializerSettings) -> Self {
        Self {
            allow_deletes: AllowDeletes::Root,
            allow_transforms: true,
            allow_undefined: settings.ignore_undefined_properties,
            max_depth: settings.max_depth,
        }
    }

    /// Options for query filter values, where no sentinel is meaningful.
    pub fn for_query(settings: &SerializerSettings) -> Self {
        Self {
            allow_deletes: AllowDeletes::None,
            allow_transforms: false,
            allow_undefined: settings.ignore_undefined_properties,
            max_depth: settings.max_depth,
        }
    }

    /// Options for the elements of an array union/remove.
    pub fn for_array_element(allow_undefined: bool, max_depth: usize) -> Self {
        Self {
            allow_deletes: AllowDeletes::None,
            allow_transforms: false,
            allow_undefined,
            max_depth,
        }
    }
}

/// Names the argument being validated in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentLabel {
    Name(String),
    Index(usize),
}

impl From<&str> for ArgumentLabel {
    fn from(name: &str) -> Self {
        ArgumentLabel::Name(name.to_string())
    }
}

impl From<usize> for ArgumentLabel {
    fn from(index: usize) -> Self {
        ArgumentLabel::Index(index)
    }
}

impl fmt::Display for ArgumentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentLabel::Name(name) => write!(f, "Value for argument \"{name}\""),
            ArgumentLabel::Index(index) => write!(f, "Element at index {index}"),
        }
    }
}

pub fn invalid_argument_message(arg: &ArgumentLabel, expected_type: &str) -> String {
    format!("{arg} is not a valid {expected_type}.")
}

/// Requires `value` to be an integer or a non-NaN double.
pub fn validate_number(arg: &ArgumentLabel, value: &Value) -> Result<()> {
    if value.is_number() {
        return Ok(());
    }
    Err(FieldTransformError::validation(
        invalid_argument_message(arg, "number"),
        None,
    ))
}

/// Recursively validates user input against the given policy.
///
/// `level` is the nesting depth of `value` and `in_array` is set once the
/// walk has entered an array.
pub fn validate_user_input(
    arg: &ArgumentLabel,
    value: &Value,
    description: &str,
    options: &ValidationOptions,
    path: Option<&FieldPath>,
    level: usize,
    in_array: bool,
) -> Result<()> {
    if level > options.max_depth {
        return Err(FieldTransformError::validation(
            format!(
                "{} Input object is deeper than {} levels or contains a cycle.",
                invalid_argument_message(arg, description),
                options.max_depth
            ),
            path,
        ));
    }

    let field_path_message = path
        .map(|path| format!(" (found in field \"{path}\")"))
        .unwrap_or_default();

    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let child = child_path(path, index.to_string());
                validate_user_input(
                    arg,
                    item,
                    description,
                    options,
                    Some(&child),
                    level + 1,
                    true,
                )?;
            }
        }
        Value::Map(fields) => {
            for (key, field) in fields {
                let child = child_path(path, key.clone());
                validate_user_input(
                    arg,
                    field,
                    description,
                    options,
                    Some(&child),
                    level + 1,
                    in_array,
                )?;
            }
        }
        Value::Undefined => {
            if options.allow_undefined && level == 0 {
                return Err(FieldTransformError::validation(
                    format!(
                        "{} \"undefined\" values are only ignored inside of objects.",
                        invalid_argument_message(arg, description)
                    ),
                    path,
                ));
            } else if !options.allow_undefined {
                return Err(FieldTransformError::validation(
                    format!(
                        "{} Cannot use \"undefined\" as a Firestore value{field_path_message}. \
                         If you want to ignore undefined values, enable `ignore_undefined_properties`.",
                        invalid_argument_message(arg, description)
                    ),
                    path,
                ));
            }
        }
        Value::Sentinel(field_value) => {
            validate_sentinel(
                arg,
                field_value,
                description,
                options,
                path,
                level,
                in_array,
                &field_path_message,
            )?;
        }
        _ => {}
    }

    trace!(level, in_array, kind = value.type_name(), "validated user input");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn validate_sentinel(
    arg: &ArgumentLabel,
    field_value: &FieldValue,
    description: &str,
    options: &ValidationOptions,
    path: Option<&FieldPath>,
    level: usize,
    in_array: bool,
    field_path_message: &str,
) -> Result<()> {
    let method_name = field_value.method_name();
    let prefix = invalid_argument_message(arg, description);

    if in_array {
        return Err(FieldTransformError::validation(
            format!("{prefix} {method_name}() cannot be used inside of an array{field_path_message}."),
            path,
        ));
    }

    match field_value.transform() {
        FieldTransform::Delete => {
            let allowed = match options.allow_deletes {
                AllowDeletes::None => false,
                AllowDeletes::Root => {
                    level == 0 || (level == 1 && path.map(FieldPath::len) == Some(1))
                }
                AllowDeletes::All => true,
            };
            if !allowed {
                return Err(FieldTransformError::validation(
                    format!(
                        "{prefix} {method_name}() must appear at the top-level and can only be used in update() or set() with {{merge:true}}{field_path_message}."
                    ),
                    path,
                ));
            }
        }
        _ => {
            if !options.allow_transforms {
                return Err(FieldTransformError::validation(
                    format!(
                        "{prefix} {method_name}() can only be used in set(), create() or update(){field_path_message}."
                    ),
                    path,
                ));
            }
        }
    }

    Ok(())
}

fn child_path(parent: Option<&FieldPath>, segment: String) -> FieldPath {
    match parent {
        Some(parent) => parent.append(segment),
        None => FieldPath::from_segment(segment),
    }
}
