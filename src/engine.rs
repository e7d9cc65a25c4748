//! Boundary to the JSON Schema validation engine.
//!
//! The compliance sweep only prepares schema URIs and interprets results;
//! checking an instance against a schema is delegated to a [`SchemaEngine`].

use jsonschema::{Retrieve, Uri};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::{ComplianceError, SchemaError};
use crate::loader::path_from_file_uri;

/// Validates an instance against the schema found at a URI.
pub trait SchemaEngine {
    /// Returns every error the engine reports, in engine order; an empty
    /// list means the instance conforms.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::InvalidSchema` when the schema cannot be
    /// retrieved or compiled.
    fn validate(&self, instance: &Value, schema_uri: &str)
        -> Result<Vec<SchemaError>, ComplianceError>;
}

/// [`SchemaEngine`] backed by the `jsonschema` crate.
///
/// The engine resolves `$ref`s itself, reading `file://` documents from disk
/// and never touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaEngine;

impl SchemaEngine for JsonSchemaEngine {
    fn validate(
        &self,
        instance: &Value,
        schema_uri: &str,
    ) -> Result<Vec<SchemaError>, ComplianceError> {
        let root = json!({ "$ref": schema_uri });

        let mut options = jsonschema::options();
        options.with_retriever(FileRetriever);
        let validator = options
            .build(&root)
            .map_err(|e| ComplianceError::InvalidSchema {
                uri: schema_uri.to_string(),
                message: e.to_string(),
            })?;

        let errors = validator
            .iter_errors(instance)
            .map(|e| {
                SchemaError::new(
                    e.to_string(),
                    Some(e.instance_path.to_string()),
                    Some(e.schema_path.to_string()),
                )
            })
            .collect();
        Ok(errors)
    }
}

/// Serves `file://` schema URIs from the local filesystem.
struct FileRetriever;

impl Retrieve for FileRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let path = path_from_file_uri(uri.as_str())
            .ok_or_else(|| format!("unsupported schema URI: {}", uri.as_str()))?;

        debug!(path = %path.display(), "engine retrieving schema");
        let content = std::fs::read_to_string(&path)?;
        let mut document: Value = serde_json::from_str(&content)?;
        drop_relative_ids(&mut document);
        Ok(document)
    }
}

/// Remove `$id`s that are not absolute URIs.
///
/// Snapshot documents carry repository-relative ids such as
/// `docs/spec/transactions/transaction.json`; left in place they would rebase
/// every relative `$ref` away from the file the document was read from.
fn drop_relative_ids(node: &mut Value) {
    match node {
        Value::Object(obj) => {
            let relative = matches!(
                obj.get("$id"),
                Some(Value::String(id)) if Url::parse(id).is_err()
            );
            if relative {
                obj.shift_remove("$id");
            }
            obj.values_mut().for_each(drop_relative_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(drop_relative_ids),
        _ => {}
    }
}
