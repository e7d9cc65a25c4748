//! Temporary on-disk copy of a processed schema.
//!
//! The validation engine only takes a URI-addressable root schema, so the
//! strict-mode tree is spilled to a file for the duration of one attempt.

use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ComplianceError, LoadError};
use crate::loader::file_uri;

const ARTIFACT_PREFIX: &str = "intake-schema-processed-";

/// A processed schema written to a uniquely named temp file.
///
/// The file is created exclusively under a random name and removed when the
/// artifact is dropped, so concurrent checks never share a path.
#[derive(Debug)]
pub struct SchemaArtifact {
    file: NamedTempFile,
}

impl SchemaArtifact {
    /// Write `schema` as pretty JSON to a fresh temp file.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::TempStorageWrite` if the file cannot be
    /// created or written.
    pub fn write(schema: &Value) -> Result<Self, ComplianceError> {
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(".json")
            .tempfile()
            .map_err(|source| ComplianceError::TempStorageWrite {
                path: std::env::temp_dir(),
                source,
            })?;

        if let Err(source) = write_pretty(&mut file, schema) {
            return Err(ComplianceError::TempStorageWrite {
                path: file.path().to_path_buf(),
                source,
            });
        }

        debug!(path = %file.path().display(), "wrote processed schema");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `file://` URI of the artifact.
    pub fn uri(&self) -> Result<String, LoadError> {
        file_uri(self.file.path())
    }
}

fn write_pretty(file: &mut NamedTempFile, schema: &Value) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *file, schema)?;
    file.flush()
}
