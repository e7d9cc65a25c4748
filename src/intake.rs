//! Captured APM Server intake requests.
//!
//! An intake request body is NDJSON: one object per line, each wrapping a
//! single record under its event type, e.g. `{"transaction": {...}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::SchemaEngine;
use crate::error::IntakeError;
use crate::types::EventKind;
use crate::validator::ComplianceValidator;

/// An intake API request as received by a mock APM Server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntakeApiRequest {
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    /// Microseconds since the epoch.
    #[serde(default)]
    pub time_received_at_server: f64,
}

/// One record extracted from an intake body.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeEvent {
    /// 1-based line number in the body.
    pub line: usize,
    pub kind: EventKind,
    /// The record without its event-type wrapper.
    pub serialized: String,
}

impl IntakeApiRequest {
    /// Wrap a raw NDJSON body.
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: body.into(),
            time_received_at_server: 0.0,
        }
    }

    /// Parse a captured request. Unknown keys are rejected.
    pub fn from_json(content: &str) -> Result<Self, IntakeError> {
        serde_json::from_str(content).map_err(|source| IntakeError::InvalidRequest { source })
    }

    /// Split the body into records, skipping blank lines.
    pub fn events(&self) -> Result<Vec<IntakeEvent>, IntakeError> {
        self.body
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| parse_event(idx + 1, line))
            .collect()
    }
}

fn parse_event(line: usize, text: &str) -> Result<IntakeEvent, IntakeError> {
    let value: Value = serde_json::from_str(text).map_err(|e| IntakeError::InvalidLine {
        line,
        message: e.to_string(),
    })?;

    let Value::Object(wrapper) = value else {
        return Err(IntakeError::InvalidLine {
            line,
            message: "expected an object".to_string(),
        });
    };

    let count = wrapper.len();
    let mut entries = wrapper.into_iter();
    let (key, record) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(IntakeError::InvalidLine {
                line,
                message: format!("expected exactly one event key, found {}", count),
            })
        }
    };
    let kind = EventKind::from_key(&key).ok_or(IntakeError::UnknownEvent { line, key })?;

    Ok(IntakeEvent {
        line,
        kind,
        serialized: record.to_string(),
    })
}

/// Validate every record of an intake request in body order.
///
/// Returns the number of records checked; stops at the first failure.
pub fn validate_intake<E: SchemaEngine>(
    validator: &ComplianceValidator<E>,
    request: &IntakeApiRequest,
) -> Result<usize, IntakeError> {
    let events = request.events()?;
    for event in &events {
        debug!(line = event.line, kind = ?event.kind, "validating intake event");
        validator
            .validate_event(event.kind, &event.serialized)
            .map_err(|source| IntakeError::Compliance {
                line: event.line,
                kind: event.kind,
                source,
            })?;
    }
    Ok(events.len())
}
