use std::env;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::validator::MAX_DEPTH;

const MAX_CONFIGURABLE_DEPTH: usize = 100;

/// Settings that shape how user payloads are validated and encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerSettings {
    /// Skip `undefined` properties nested in objects instead of rejecting them.
    pub ignore_undefined_properties: bool,
    pub max_depth: usize,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            ignore_undefined_properties: false,
            max_depth: MAX_DEPTH,
        }
    }
}

impl SerializerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = SerializerSettings::default();

        if let Some(flag) = lookup("FIRESTORE_IGNORE_UNDEFINED_PROPERTIES") {
            if !flag.trim().is_empty() {
                settings.ignore_undefined_properties = parse_bool(flag.trim())
                    .context("failed to parse FIRESTORE_IGNORE_UNDEFINED_PROPERTIES as bool")?;
            }
        }

        if let Some(depth) = lookup("FIRESTORE_MAX_DEPTH") {
            if !depth.trim().is_empty() {
                settings.max_depth = depth
                    .trim()
                    .parse::<usize>()
                    .context("failed to parse FIRESTORE_MAX_DEPTH as usize")?;
            }
        }

        settings.validate()?;

        info!(
            ignore_undefined_properties = settings.ignore_undefined_properties,
            max_depth = settings.max_depth,
            "serializer settings resolved"
        );

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_CONFIGURABLE_DEPTH {
            return Err(anyhow!(
                "max_depth must be within [1, {}], got {}",
                MAX_CONFIGURABLE_DEPTH,
                self.max_depth
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    value.parse::<bool>().or_else(|_| match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(anyhow!("invalid boolean value: {}", other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let settings = SerializerSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, SerializerSettings::default());
        assert_eq!(settings.max_depth, 20);
    }

    #[test]
    fn test_reads_variables() {
        let settings = SerializerSettings::from_lookup(lookup_from(&[
            ("FIRESTORE_IGNORE_UNDEFINED_PROPERTIES", "1"),
            ("FIRESTORE_MAX_DEPTH", "32"),
        ]))
        .unwrap();
        assert!(settings.ignore_undefined_properties);
        assert_eq!(settings.max_depth, 32);
    }

    #[test]
    fn test_rejects_invalid_bool() {
        let err = SerializerSettings::from_lookup(lookup_from(&[(
            "FIRESTORE_IGNORE_UNDEFINED_PROPERTIES",
            "maybe",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("FIRESTORE_IGNORE_UNDEFINED_PROPERTIES"));
    }

    #[test]
    fn test_rejects_out_of_range_depth() {
        assert!(
            SerializerSettings::from_lookup(lookup_from(&[("FIRESTORE_MAX_DEPTH", "0")])).is_err()
        );
        assert!(
            SerializerSettings::from_lookup(lookup_from(&[("FIRESTORE_MAX_DEPTH", "101")]))
                .is_err()
        );
    }
}
