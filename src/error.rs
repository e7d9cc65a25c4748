//! Error types for schema loading, transformation and compliance checks.

use std::path::PathBuf;
use thiserror::Error;

use crate::report::ComplianceReport;
use crate::types::{EventKind, ValidationVariant};

/// Errors while loading a schema document and inlining its `$ref` targets.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Schema errors (exit code 2)
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid $ref in {path}: expected string, got {actual}")]
    InvalidRef { path: PathBuf, actual: String },

    #[error("unsupported $ref \"{value}\" in {path}: only file references can be inlined")]
    UnsupportedRef { path: PathBuf, value: String },

    #[error("$ref \"{reference}\" in {path} resolves to {actual}, expected an object")]
    RefTargetNotObject {
        path: PathBuf,
        reference: String,
        actual: &'static str,
    },

    #[error("cannot express {path} as a file URI")]
    NotFileUri { path: PathBuf },

    #[error("fragment {fragment} not found in {path}")]
    FragmentNotFound { path: PathBuf, fragment: String },

    #[error("circular reference to {path} (chain: {})", display_chain(.chain))]
    CircularReference { path: PathBuf, chain: Vec<PathBuf> },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// A key collision while flattening a ref-sourced `allOf` into its parent.
///
/// Conflicts are never resolved by overwriting: they mean the schema
/// composition itself is malformed.
#[derive(Debug, Error)]
pub enum MergeConflict {
    #[error("failed to merge allOf: key \"{key}\" already has sub-key \"{sub_key}\"")]
    DuplicateKey { key: String, sub_key: String },

    #[error("failed to merge allOf: key \"{key}\" already contains {item}")]
    DuplicateItem { key: String, item: String },

    #[error("failed to merge allOf: key \"{key}\" is {expected} but allOf member has {actual}")]
    KindMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors from a compliance check of one serialized record.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Merge(#[from] MergeConflict),

    #[error("failed to write processed schema to {path}: {source}")]
    TempStorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialized data is not valid JSON: {source}")]
    InvalidPayload {
        #[source]
        source: serde_json::Error,
    },

    #[error("validator rejected schema {uri}: {message}")]
    InvalidSchema { uri: String, message: String },

    #[error("{report}")]
    Invalid {
        variant: ValidationVariant,
        report: ComplianceReport,
    },
}

impl ComplianceError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ComplianceError::Load(e) => e.exit_code(),
            ComplianceError::TempStorageWrite { .. } => 3,
            ComplianceError::Invalid { .. } | ComplianceError::InvalidPayload { .. } => 1,
            ComplianceError::Merge(_) | ComplianceError::InvalidSchema { .. } => 2,
        }
    }

    /// Engine-reported errors when this is a validation failure.
    pub fn schema_errors(&self) -> &[SchemaError] {
        match self {
            ComplianceError::Invalid { report, .. } => report.errors(),
            _ => &[],
        }
    }
}

/// Errors while checking a captured intake request event by event.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid intake request: {source}")]
    InvalidRequest {
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: invalid event: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("line {line}: unknown event type \"{key}\"")]
    UnknownEvent { line: usize, key: String },

    #[error("line {line} ({kind:?}): {source}")]
    Compliance {
        line: usize,
        kind: EventKind,
        #[source]
        source: ComplianceError,
    },
}

impl IntakeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            IntakeError::InvalidRequest { .. } => 2,
            IntakeError::InvalidLine { .. } | IntakeError::UnknownEvent { .. } => 1,
            IntakeError::Compliance { source, .. } => source.exit_code(),
        }
    }
}

/// Single validation error as reported by the schema engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaError {
    /// Human-readable error message.
    pub message: String,
    /// JSON Pointer (RFC 6901) to the offending location in the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// JSON Pointer to the schema keyword that rejected the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

impl SchemaError {
    /// Build an error, treating empty paths as absent.
    pub fn new(
        message: impl Into<String>,
        property: Option<String>,
        pointer: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            property: property.filter(|p| !p.is_empty()),
            pointer: pointer.filter(|p| !p.is_empty()),
        }
    }
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(property) = &self.property {
            write!(f, "; property: '{}'", property)?;
        }
        if let Some(pointer) = &self.pointer {
            write!(f, "; pointer: '{}'", pointer)?;
        }
        Ok(())
    }
}
