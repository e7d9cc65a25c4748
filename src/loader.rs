//! Schema loading and `$ref` inlining.
//!
//! A schema document is loaded fresh from disk and every `$ref` inside it is
//! resolved by loading the referenced file (relative to the document that
//! contains the ref) and copying its top-level keys into the referencing node.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::LoadError;
use crate::types::json_type_name;

/// Load a schema from a file path without touching its `$ref`s.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
        path: PathBuf::from("<string>"),
        source,
    })
}

/// Load a schema document and inline every `$ref` it reaches.
///
/// Children are resolved before their parent's own `$ref`, so a referenced
/// document is fully resolved before it is merged into the referencer. The
/// merge is shallow and local keys always win. `$ref` keys are left in place.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` for a missing document or ref target and
/// `LoadError::CircularReference` when a document refers back to itself
/// through its own resolution chain.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    load_document_inner(path, &mut Vec::new())
}

fn load_document_inner(path: &Path, chain: &mut Vec<PathBuf>) -> Result<Value, LoadError> {
    let document = canonicalize(path)?;

    if chain.contains(&document) {
        let mut cycle = chain.clone();
        cycle.push(document.clone());
        return Err(LoadError::CircularReference {
            path: document,
            chain: cycle,
        });
    }

    debug!(path = %document.display(), depth = chain.len(), "loading schema document");
    let schema = load_schema(&document)?;

    chain.push(document.clone());
    let resolved = resolve_refs(schema, &document, chain);
    chain.pop();
    resolved
}

fn resolve_refs(
    node: Value,
    document: &Path,
    chain: &mut Vec<PathBuf>,
) -> Result<Value, LoadError> {
    match node {
        Value::Object(obj) => {
            let mut resolved = Map::with_capacity(obj.len());
            for (key, value) in obj {
                resolved.insert(key, resolve_refs(value, document, chain)?);
            }

            let target = match resolved.get("$ref") {
                None => None,
                Some(Value::String(reference)) => {
                    Some(load_ref_target(reference, document, chain)?)
                }
                Some(other) => {
                    return Err(LoadError::InvalidRef {
                        path: document.to_path_buf(),
                        actual: json_type_name(other).to_string(),
                    })
                }
            };

            match target {
                None => {}
                Some(Value::Object(target)) => {
                    for (key, value) in target {
                        resolved.entry(key).or_insert(value);
                    }
                }
                Some(other) => {
                    return Err(LoadError::RefTargetNotObject {
                        path: document.to_path_buf(),
                        reference: resolved
                            .get("$ref")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        actual: json_type_name(&other),
                    })
                }
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| resolve_refs(item, document, chain))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}

fn load_ref_target(
    reference: &str,
    document: &Path,
    chain: &mut Vec<PathBuf>,
) -> Result<Value, LoadError> {
    let (file_part, fragment) = match reference.find('#') {
        Some(idx) => (&reference[..idx], Some(&reference[idx..])),
        None => (reference, None),
    };

    if file_part.is_empty() {
        return Err(LoadError::UnsupportedRef {
            path: document.to_path_buf(),
            value: reference.to_string(),
        });
    }

    let base_dir = document.parent().unwrap_or_else(|| Path::new("."));
    let target_path = base_dir.join(file_part);
    let loaded = load_document_inner(&target_path, chain)?;

    match fragment {
        Some(fragment) => navigate_fragment(&loaded, fragment).cloned().ok_or_else(|| {
            LoadError::FragmentNotFound {
                path: target_path,
                fragment: fragment.to_string(),
            }
        }),
        None => Ok(loaded),
    }
}

/// Navigate a JSON Pointer fragment (e.g., "#/definitions/foo").
///
/// An empty fragment (`"#"`) addresses the whole schema.
pub fn navigate_fragment<'a>(schema: &'a Value, fragment: &str) -> Option<&'a Value> {
    let pointer = fragment.trim_start_matches('#');
    if pointer.is_empty() {
        return Some(schema);
    }
    schema.pointer(pointer)
}

pub(crate) fn canonicalize(path: &Path) -> Result<PathBuf, LoadError> {
    path.canonicalize().map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Convert an absolute path into a percent-encoded `file://` URI.
///
/// # Errors
///
/// Returns `LoadError::NotFileUri` for relative paths.
pub fn file_uri(path: &Path) -> Result<String, LoadError> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| LoadError::NotFileUri {
            path: path.to_path_buf(),
        })
}

/// Inverse of [`file_uri`]: the local path a `file://` URI points at.
///
/// Any fragment is ignored. Returns `None` for other schemes.
pub fn path_from_file_uri(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}
