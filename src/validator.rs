//! Compliance sweep of serialized records across schema variants.

use serde_json::Value;
use tracing::{debug, warn};

use crate::artifact::SchemaArtifact;
use crate::config::SpecsConfig;
use crate::engine::{JsonSchemaEngine, SchemaEngine};
use crate::error::ComplianceError;
use crate::loader::{canonicalize, file_uri, load_document};
use crate::report::ComplianceReport;
use crate::transform::process_schema;
use crate::types::{EventKind, Strictness, ValidationVariant};

/// Checks serialized intake records against both pinned schema snapshots.
///
/// Every call reloads schema documents from disk; nothing is cached.
#[derive(Debug, Clone)]
pub struct ComplianceValidator<E = JsonSchemaEngine> {
    config: SpecsConfig,
    engine: E,
}

impl ComplianceValidator<JsonSchemaEngine> {
    /// Validator using the `jsonschema` engine.
    pub fn new(config: SpecsConfig) -> Self {
        Self::with_engine(config, JsonSchemaEngine)
    }
}

impl<E: SchemaEngine> ComplianceValidator<E> {
    /// Validator using a custom engine.
    pub fn with_engine(config: SpecsConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &SpecsConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the full sweep: earliest/permissive, latest/permissive, latest/strict.
    ///
    /// Stops at the first failing attempt.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Invalid` carrying every error of the failing
    /// attempt, or the load, merge or storage error that aborted the sweep.
    pub fn validate(&self, serialized: &str, schema_path: &str) -> Result<(), ComplianceError> {
        for variant in ValidationVariant::SWEEP {
            self.validate_variant(serialized, schema_path, variant)?;
        }
        Ok(())
    }

    /// Run a single attempt of the sweep.
    ///
    /// `schema_path` is relative to the variant's spec directory.
    pub fn validate_variant(
        &self,
        serialized: &str,
        schema_path: &str,
        variant: ValidationVariant,
    ) -> Result<(), ComplianceError> {
        let instance: Value = serde_json::from_str(serialized)
            .map_err(|source| ComplianceError::InvalidPayload { source })?;
        let document = canonicalize(
            &self
                .config
                .schema_path(variant.generation(), schema_path),
        )?;

        debug!(%variant, schema = %document.display(), "validating serialized data");

        let errors = match variant.strictness() {
            Strictness::Permissive => self.engine.validate(&instance, &file_uri(&document)?)?,
            Strictness::Strict => {
                let processed = process_schema(load_document(&document)?, Strictness::Strict)?;
                let artifact = SchemaArtifact::write(&processed)?;
                self.engine.validate(&instance, &artifact.uri()?)?
            }
        };

        if errors.is_empty() {
            return Ok(());
        }

        warn!(%variant, errors = errors.len(), "serialized data failed schema validation");
        Err(ComplianceError::Invalid {
            variant,
            report: ComplianceReport::new(errors, serialized.to_string()),
        })
    }

    /// Run the sweep with the schema for `kind`.
    pub fn validate_event(&self, kind: EventKind, serialized: &str) -> Result<(), ComplianceError> {
        self.validate(serialized, kind.schema_path())
    }

    pub fn validate_metadata(&self, serialized: &str) -> Result<(), ComplianceError> {
        self.validate_event(EventKind::Metadata, serialized)
    }

    pub fn validate_transaction(&self, serialized: &str) -> Result<(), ComplianceError> {
        self.validate_event(EventKind::Transaction, serialized)
    }

    pub fn validate_span(&self, serialized: &str) -> Result<(), ComplianceError> {
        self.validate_event(EventKind::Span, serialized)
    }
}
