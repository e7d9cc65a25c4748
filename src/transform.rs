//! Rewrite passes applied to a ref-resolved schema before strict validation.
//!
//! Every pass takes the tree by value and returns the rewritten tree.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::MergeConflict;
use crate::types::{
    json_type_name, Strictness, ADDITIONAL_PROPERTIES_TRIGGERS, COMBINATOR_KEYS,
    UNMERGED_MEMBER_KEYS,
};

/// Run the full processing pipeline on a ref-resolved schema.
///
/// Flattens ref-sourced `allOf`s, injects `additionalProperties: false` when
/// `strictness` is strict, then strips every `$ref`.
///
/// # Errors
///
/// Returns `MergeConflict` if an `allOf` member redefines a sub-key the
/// parent already has.
pub fn process_schema(schema: Value, strictness: Strictness) -> Result<Value, MergeConflict> {
    let merged = merge_all_of_from_ref(schema)?;
    let tightened = match strictness {
        Strictness::Strict => disable_additional_properties(merged),
        Strictness::Permissive => merged,
    };
    Ok(strip_refs(tightened))
}

/// Flatten every `allOf` that has at least one member still carrying `$ref`.
///
/// Members are merged into the owning node in array order. Keys the node
/// lacks are copied; keys holding a scalar on the node are left alone;
/// composite keys receive the member's entries and any collision fails.
/// `allOf` compositions written inline (no `$ref` member) are untouched.
pub fn merge_all_of_from_ref(node: Value) -> Result<Value, MergeConflict> {
    match node {
        Value::Object(obj) => {
            let mut merged = Map::with_capacity(obj.len());
            for (key, value) in obj {
                merged.insert(key, merge_all_of_from_ref(value)?);
            }

            if !has_ref_sourced_all_of(&merged) {
                return Ok(Value::Object(merged));
            }

            if let Some(Value::Array(members)) = merged.shift_remove("allOf") {
                debug!(members = members.len(), "flattening ref-sourced allOf");
                for member in members {
                    if let Value::Object(member) = member {
                        merge_member(&mut merged, member)?;
                    }
                }
            }
            Ok(Value::Object(merged))
        }
        Value::Array(items) => items
            .into_iter()
            .map(merge_all_of_from_ref)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}

fn has_ref_sourced_all_of(node: &Map<String, Value>) -> bool {
    match node.get("allOf") {
        Some(Value::Array(members)) => members
            .iter()
            .any(|member| member.get("$ref").is_some()),
        _ => false,
    }
}

fn merge_member(
    parent: &mut Map<String, Value>,
    member: Map<String, Value>,
) -> Result<(), MergeConflict> {
    for (key, value) in member {
        if UNMERGED_MEMBER_KEYS.contains(&key.as_str()) {
            continue;
        }

        match parent.get_mut(&key) {
            None => {
                parent.insert(key, value);
            }
            Some(Value::Object(dst)) => match value {
                Value::Object(src) => {
                    for (sub_key, sub_value) in src {
                        if dst.contains_key(&sub_key) {
                            return Err(MergeConflict::DuplicateKey { key, sub_key });
                        }
                        dst.insert(sub_key, sub_value);
                    }
                }
                // Non-object member into an object: a conflict, not a no-op.
                other => {
                    return Err(MergeConflict::KindMismatch {
                        key,
                        expected: "object",
                        actual: json_type_name(&other),
                    })
                }
            },
            Some(Value::Array(dst)) => match value {
                // Arrays merge by value: items are appended and a repeat conflicts.
                Value::Array(src) => {
                    for item in src {
                        if dst.contains(&item) {
                            return Err(MergeConflict::DuplicateItem {
                                key,
                                item: item.to_string(),
                            });
                        }
                        dst.push(item);
                    }
                }
                other => {
                    return Err(MergeConflict::KindMismatch {
                        key,
                        expected: "array",
                        actual: json_type_name(&other),
                    })
                }
            },
            // Scalar on the parent: parent wins.
            Some(_) => {}
        }
    }
    Ok(())
}

/// Set `additionalProperties: false` on every node declaring properties.
///
/// Subtrees under `allOf` and `anyOf` are not visited; their members are
/// only tightened once a ref-sourced merge has lifted them into the parent.
pub fn disable_additional_properties(node: Value) -> Value {
    match node {
        Value::Object(obj) => {
            let declares_properties = ADDITIONAL_PROPERTIES_TRIGGERS
                .iter()
                .any(|key| obj.contains_key(*key));

            let mut result: Map<String, Value> = obj
                .into_iter()
                .map(|(key, value)| {
                    if COMBINATOR_KEYS.contains(&key.as_str()) {
                        (key, value)
                    } else {
                        let value = disable_additional_properties(value);
                        (key, value)
                    }
                })
                .collect();

            if declares_properties {
                result.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Object(result)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(disable_additional_properties)
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Remove every `$ref` key.
///
/// Once targets are inlined the refs are redundant, and `$ref` next to
/// sibling keywords is ignored or rejected by older drafts.
pub fn strip_refs(node: Value) -> Value {
    match node {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .filter(|(key, _)| key != "$ref")
                .map(|(key, value)| (key, strip_refs(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_refs).collect()),
        scalar => scalar,
    }
}
