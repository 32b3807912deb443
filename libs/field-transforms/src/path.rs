use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::{char, one_of},
    combinator::{cut, map},
    error::VerboseError,
    multi::{many0, separated_list1},
    sequence::{preceded, terminated},
    IResult,
};

use crate::{FieldTransformError, Result};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const RESERVED_CHARACTERS: &[char] = &['~', '*', '/', '[', ']'];

/// A path to a field inside a document, as a list of raw segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() {
            return Err(FieldTransformError::argument(
                "Function \"FieldPath()\" requires at least 1 argument.",
            ));
        }
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(FieldTransformError::argument(format!(
                "Element at index {index} should not be an empty string."
            )));
        }
        Ok(Self { segments })
    }

    /// Single-segment path. Callers guarantee the segment is non-empty.
    pub(crate) fn from_segment(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Parses a dotted path; segments may be backtick-quoted.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(FieldTransformError::argument(
                "Paths must be non-empty strings.",
            ));
        }

        let (remaining, segments) = match field_path_parser(text) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let offset = e
                    .errors
                    .first()
                    .map(|(fragment, _)| text.len().saturating_sub(fragment.len()))
                    .unwrap_or(0);
                return Err(invalid_path(text, offset));
            }
            Err(nom::Err::Incomplete(_)) => return Err(invalid_path(text, text.len())),
        };

        if !remaining.is_empty() {
            let offset = text.len() - remaining.len();
            if remaining.starts_with(RESERVED_CHARACTERS) {
                return Err(FieldTransformError::argument(format!(
                    "Invalid field path {text:?}: paths can't contain ~, *, /, [, or ] (offset {offset})."
                )));
            }
            return Err(invalid_path(text, offset));
        }

        Self::new(segments)
    }

    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Escaped dotted representation used on the wire.
    pub fn formatted_name(&self) -> String {
        self.segments
            .iter()
            .map(|segment| format_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted_name())
    }
}

fn invalid_path(text: &str, offset: usize) -> FieldTransformError {
    FieldTransformError::argument(format!(
        "Invalid field path {text:?} at offset {offset}: paths must not be empty, begin with '.', end with '.', or contain '..'."
    ))
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn format_segment(segment: &str) -> String {
    if is_simple_segment(segment) {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn field_path_parser(input: &str) -> Res<'_, Vec<String>> {
    separated_list1(char('.'), segment_parser)(input)
}

fn segment_parser(input: &str) -> Res<'_, String> {
    alt((quoted_segment, plain_segment))(input)
}

fn plain_segment(input: &str) -> Res<'_, String> {
    map(
        take_while1(|ch: char| ch != '.' && ch != '`' && !RESERVED_CHARACTERS.contains(&ch)),
        str::to_string,
    )(input)
}

fn quoted_segment(input: &str) -> Res<'_, String> {
    map(
        preceded(
            char('`'),
            cut(terminated(
                many0(alt((
                    map(is_not("\\`"), str::to_string),
                    map(preceded(char('\\'), one_of("\\`")), String::from),
                ))),
                char('`'),
            )),
        ),
        |parts| parts.concat(),
    )(input)
}
