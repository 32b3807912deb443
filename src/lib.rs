//! Shared fixtures for the field transform benches and workspace tests.

pub mod bench_support;

// Re-export external crates needed by benches
pub use firestore_field_transforms;
pub use serde_json;
