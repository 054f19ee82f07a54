//! Filter and update evaluation shared by the bundled store drivers.

use std::borrow::Cow;

use serde_json::Value;

use super::{Document, ID_KEY};
use crate::errors::StoreError;

const AND: &str = "$and";
const EQ: &str = "$eq";
const IN: &str = "$in";
const SET: &str = "$set";

fn unsupported(what: &str, name: &str) -> StoreError {
    StoreError::Other {
        message: Cow::Owned(format!("unsupported {what} `{name}`")),
    }
}

/// Resolves a possibly dotted key (`address.city`) inside a document.
fn lookup<'a>(doc: &'a Document, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Equality as document stores apply it: a missing field equals `null`, and an
/// array field matches when any element does.
fn value_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|item| item == expected),
        Some(actual) => actual == expected,
    }
}

/// Whether `doc` satisfies every predicate in `filter`.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let satisfied = if key == AND {
            let clauses = condition
                .as_array()
                .ok_or_else(|| unsupported("operand for", AND))?;
            let mut all = true;
            for clause in clauses {
                let clause = clause.as_object().ok_or_else(|| unsupported("clause in", AND))?;
                if !matches(doc, clause)? {
                    all = false;
                    break;
                }
            }
            all
        } else {
            field_matches(lookup(doc, key), condition)?
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn field_matches(actual: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    let Some(operators) = condition.as_object().filter(|ops| ops.keys().all(|k| k.starts_with('$'))) else {
        return Ok(value_equals(actual, condition));
    };
    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            EQ => value_equals(actual, operand),
            IN => operand
                .as_array()
                .ok_or_else(|| unsupported("operand for", IN))?
                .iter()
                .any(|candidate| value_equals(actual, candidate)),
            other => return Err(unsupported("filter operator", other)),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Applies a `{"$set": {..}}` update. Returns whether the document changed.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let mut changed = false;
    for (op, fields) in update {
        if op != SET {
            return Err(unsupported("update operator", op));
        }
        let fields = fields.as_object().ok_or_else(|| unsupported("operand for", SET))?;
        for (key, value) in fields {
            if doc.get(key) != Some(value) {
                doc.insert(key.clone(), value.clone());
                changed = true;
            }
        }
    }
    Ok(changed)
}

/// Starting document for an upsert: the equality predicates of the filter.
pub fn seed_from_filter(filter: &Document) -> Document {
    let mut seed = Document::new();
    collect_equalities(filter, &mut seed);
    seed
}

fn collect_equalities(filter: &Document, seed: &mut Document) {
    for (key, condition) in filter {
        if key == AND {
            for clause in condition.as_array().into_iter().flatten() {
                if let Some(clause) = clause.as_object() {
                    collect_equalities(clause, seed);
                }
            }
        } else if key.starts_with('$') || key.contains('.') {
            continue;
        } else if let Some(value) = condition.as_object().and_then(|ops| ops.get(EQ)) {
            seed.insert(key.clone(), value.clone());
        } else if !condition.is_object() {
            seed.insert(key.clone(), condition.clone());
        }
    }
}

/// Returns the document id, assigning a fresh one when absent.
pub fn ensure_id(doc: &mut Document) -> Value {
    doc.entry(ID_KEY)
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()))
        .clone()
}

/// Text form of an id, used as a storage key.
pub(crate) fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
