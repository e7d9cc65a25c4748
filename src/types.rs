//! Core types for intake schema compliance checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys that make a node an object schema subject to strict mode.
pub const ADDITIONAL_PROPERTIES_TRIGGERS: &[&str] = &["properties", "patternProperties"];

/// Keys the strict-mode pass never descends into.
pub const COMBINATOR_KEYS: &[&str] = &["allOf", "anyOf"];

/// Keys of an `allOf` member that are never merged into the parent.
pub const UNMERGED_MEMBER_KEYS: &[&str] = &["$ref", "$id", "title"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Which pinned snapshot of the intake API schema to validate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecGeneration {
    /// Oldest APM Server intake API the agent still supports.
    Earliest,
    /// Newest intake API the agent was written against.
    Latest,
}

/// Whether undeclared object properties are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Schema used as published.
    #[default]
    Permissive,
    /// `additionalProperties: false` injected before validation.
    Strict,
}

/// One cell of the validation matrix.
///
/// Only three combinations exist: the earliest snapshot is never checked
/// strictly, because older servers ignore fields they do not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationVariant {
    generation: SpecGeneration,
    strictness: Strictness,
}

impl ValidationVariant {
    pub const EARLIEST_PERMISSIVE: Self = Self {
        generation: SpecGeneration::Earliest,
        strictness: Strictness::Permissive,
    };
    pub const LATEST_PERMISSIVE: Self = Self {
        generation: SpecGeneration::Latest,
        strictness: Strictness::Permissive,
    };
    pub const LATEST_STRICT: Self = Self {
        generation: SpecGeneration::Latest,
        strictness: Strictness::Strict,
    };

    /// Attempt order for a full compliance sweep.
    pub const SWEEP: [Self; 3] = [
        Self::EARLIEST_PERMISSIVE,
        Self::LATEST_PERMISSIVE,
        Self::LATEST_STRICT,
    ];

    /// Returns `None` for the (earliest, strict) combination.
    pub fn new(generation: SpecGeneration, strictness: Strictness) -> Option<Self> {
        match (generation, strictness) {
            (SpecGeneration::Earliest, Strictness::Strict) => None,
            _ => Some(Self {
                generation,
                strictness,
            }),
        }
    }

    pub fn generation(&self) -> SpecGeneration {
        self.generation
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }
}

impl std::fmt::Display for ValidationVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = match self.generation {
            SpecGeneration::Earliest => "earliest",
            SpecGeneration::Latest => "latest",
        };
        let strictness = match self.strictness {
            Strictness::Permissive => "permissive",
            Strictness::Strict => "strict",
        };
        write!(f, "{}/{}", generation, strictness)
    }
}

/// Kind of intake event record, each with its own schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Metadata,
    Transaction,
    Span,
}

impl EventKind {
    /// Schema path relative to a snapshot's spec directory.
    pub fn schema_path(&self) -> &'static str {
        match self {
            EventKind::Metadata => "metadata.json",
            EventKind::Transaction => "transactions/transaction.json",
            EventKind::Span => "spans/span.json",
        }
    }

    /// Parse the top-level key of an intake NDJSON line.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "metadata" => Some(EventKind::Metadata),
            "transaction" => Some(EventKind::Transaction),
            "span" => Some(EventKind::Span),
            _ => None,
        }
    }
}
