//! Human-readable compliance failure reports.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::SchemaError;

/// First line of every failure report.
pub const REPORT_HEADER: &str =
    "Serialized data failed APM Server Intake API JSON schema validation.";

const INDENT: &str = "    ";

/// Errors from a failed attempt together with the payload that caused them.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    errors: Vec<SchemaError>,
    serialized: String,
}

impl ComplianceReport {
    pub fn new(errors: Vec<SchemaError>, serialized: String) -> Self {
        Self { errors, serialized }
    }

    /// Errors in the order the engine reported them.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// The payload exactly as submitted.
    pub fn serialized(&self) -> &str {
        &self.serialized
    }
}

impl fmt::Display for ComplianceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_report(&self.errors, &self.serialized))
    }
}

/// Render errors and payload as a failure report.
///
/// ```text
/// Serialized data failed APM Server Intake API JSON schema validation.
///     Errors [1]:
///         1) "id" is a required property; pointer: '/required'
///     Serialized data:
///         {}
/// ```
pub fn format_report(errors: &[SchemaError], serialized: &str) -> String {
    let numbered = errors
        .iter()
        .enumerate()
        .map(|(i, error)| format!("{}) {}", i + 1, error))
        .collect::<Vec<_>>()
        .join("\n");

    let errors_block = format!("Errors [{}]:\n{}", errors.len(), indent(&numbered));
    let data_block = format!("Serialized data:\n{}", indent(&pretty_payload(serialized)));

    format!(
        "{}\n{}\n{}",
        REPORT_HEADER,
        indent(&errors_block),
        indent(&data_block)
    )
}

/// Prefix every non-empty line with one indent level.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty_payload(serialized: &str) -> String {
    serde_json::from_str::<Value>(serialized)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| serialized.to_string())
}
