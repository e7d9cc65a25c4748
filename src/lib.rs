//! APM Intake Schema Compliance
//!
//! Checks serialized APM agent records (metadata, transactions, spans)
//! against pinned snapshots of the APM Server intake API JSON Schemas.
//!
//! Each record goes through a fixed sweep, stopping at the first failure:
//!
//! | Snapshot | Strictness | Schema handed to the engine |
//! |----------|------------|-----------------------------|
//! | earliest supported | permissive | on-disk document |
//! | latest used | permissive | on-disk document |
//! | latest used | strict | refs inlined, ref-sourced `allOf` flattened, `additionalProperties: false` |
//!
//! # Example
//!
//! ```no_run
//! use intake_schema::{ComplianceValidator, SpecsConfig};
//!
//! let validator = ComplianceValidator::new(SpecsConfig::new("APM_Server_intake_API_schema"));
//! match validator.validate_span(r#"{"id": "0123456789abcdef"}"#) {
//!     Ok(()) => println!("compliant"),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Strict schemas
//!
//! ```
//! use intake_schema::{process_schema, Strictness};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "allOf": [
//!         { "$ref": "../timestamp_epoch.json", "properties": { "timestamp": {} } },
//!         { "properties": { "id": { "type": "string" } } }
//!     ]
//! });
//!
//! let strict = process_schema(schema, Strictness::Strict).unwrap();
//! assert_eq!(strict["additionalProperties"], false);
//! assert!(strict["properties"].get("timestamp").is_some());
//! assert!(strict.get("allOf").is_none());
//! ```

mod artifact;
mod config;
mod engine;
mod error;
mod intake;
mod loader;
mod report;
mod transform;
mod types;
mod validator;

pub use artifact::SchemaArtifact;
pub use config::{SpecsConfig, EARLIEST_SUPPORTED_SPEC_DIR, LATEST_USED_SPEC_DIR};
pub use engine::{JsonSchemaEngine, SchemaEngine};
pub use error::{ComplianceError, IntakeError, LoadError, MergeConflict, SchemaError};
pub use intake::{validate_intake, IntakeApiRequest, IntakeEvent};
pub use loader::{
    file_uri, load_document, load_schema, load_schema_str, navigate_fragment, path_from_file_uri,
};
pub use report::{format_report, ComplianceReport, REPORT_HEADER};
pub use transform::{
    disable_additional_properties, merge_all_of_from_ref, process_schema, strip_refs,
};
pub use types::{EventKind, SpecGeneration, Strictness, ValidationVariant};
pub use validator::ComplianceValidator;
