use std::collections::BTreeMap;

use anyhow::{Context, Result};
use firestore_field_transforms::{
    validate_document, DocumentMask, DocumentMaskProto, DocumentTransform, FieldTransformProto,
    FieldValue, MapValue, ProtoEncoder, SerializerSettings, ValidationOptions, Value,
};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a compact subscriber; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// The three parts of a write derived from one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWrite {
    pub fields: MapValue,
    pub mask: DocumentMaskProto,
    pub transforms: Vec<FieldTransformProto>,
}

pub struct TransformBenchFixture {
    pub document: BTreeMap<String, Value>,
    pub settings: SerializerSettings,
    pub encoder: ProtoEncoder,
}

impl TransformBenchFixture {
    /// A document with `field_count` groups of literals and sentinels.
    pub fn new(field_count: usize) -> Result<Self> {
        let mut document = BTreeMap::new();
        for index in 0..field_count {
            document.insert(format!("title_{index}"), Value::from(format!("item {index}")));
            document.insert(
                format!("views_{index}"),
                Value::from(FieldValue::increment(1)),
            );
            document.insert(
                format!("tags_{index}"),
                Value::from(
                    FieldValue::array_union(vec!["alpha", "beta", "gamma"])
                        .context("array union fixture")?,
                ),
            );
            document.insert(
                format!("meta_{index}"),
                Value::map([
                    ("updated", Value::from(FieldValue::server_timestamp())),
                    ("owner", Value::from("bench")),
                    ("stale", Value::from(FieldValue::delete())),
                ]),
            );
        }

        Ok(Self {
            document,
            settings: SerializerSettings::default(),
            encoder: ProtoEncoder::new(),
        })
    }

    pub fn with_settings(mut self, settings: SerializerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validates the payload and splits it into fields, mask and transforms.
    pub fn prepare(&self) -> Result<PreparedWrite> {
        let options = ValidationOptions {
            allow_deletes: firestore_field_transforms::AllowDeletes::All,
            ..ValidationOptions::for_write(&self.settings)
        };
        validate_document(&self.document, &options).context("document failed validation")?;

        let transform = DocumentTransform::from_object(&self.document);
        transform
            .validate(&self.settings)
            .context("field transforms failed validation")?;

        let prepared = PreparedWrite {
            fields: self
                .encoder
                .encode_fields(&self.document)
                .context("failed to encode document fields")?,
            mask: DocumentMask::from_object(&self.document).to_proto(),
            transforms: transform
                .to_proto(&self.encoder)
                .context("failed to encode field transforms")?,
        };

        debug!(
            fields = prepared.fields.fields.len(),
            mask = prepared.mask.field_paths.len(),
            transforms = prepared.transforms.len(),
            "prepared write"
        );

        Ok(prepared)
    }
}
