//! Response normalization.
//!
//! The Hero Vault backend has shipped several response shapes over time. Each
//! canonical field is resolved through an ordered list of candidate keys; the
//! first key that is present and not `null` wins.

use serde_json::Value;

use super::models::{RemoteCharacterRecord, RemoteCharacterSummary};

pub const UNKNOWN_ID: &str = "unknown-id";
pub const UNKNOWN_SYSTEM: &str = "unknown-system";
pub const UNNAMED_HERO: &str = "Unnamed Hero";

/// Envelope keys that may wrap the character list, checked in order.
pub const LIST_ENVELOPES: &[&str] = &["characters", "results"];

pub const SUMMARY_ID: &[&str] = &["id", "_id", "characterId"];
pub const SUMMARY_NAME: &[&str] = &["name", "label"];
pub const SUMMARY_SYSTEM: &[&str] = &["system", "systemId"];
pub const SUMMARY_LABEL: &[&str] = &["label", "world", "campaign"];
pub const SUMMARY_UPDATED_AT: &[&str] = &["updatedAt", "updated_at", "modifiedAt", "createdAt"];

pub const RECORD_ID: &[&str] = &["id", "_id", "vaultId"];

/// Returns the first candidate that holds a scalar value, rendered as a string.
///
/// Objects and arrays are treated like missing keys.
pub fn lookup(item: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(scalar_to_string)
}

/// Like [`lookup`], with a fixed fallback.
pub fn lookup_or(item: &Value, candidates: &[&str], fallback: &str) -> String {
    lookup(item, candidates).unwrap_or_else(|| fallback.to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Finds the character array inside any of the accepted envelopes.
///
/// Returns an empty slice when the body matches none of them.
pub fn extract_list(body: &Value) -> &[Value] {
    if let Value::Array(items) = body {
        return items;
    }

    LIST_ENVELOPES
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Normalizes one list entry. `system_fallback` is used when the entry names
/// no system of its own.
pub fn summary_from_value(item: &Value, system_fallback: &str) -> RemoteCharacterSummary {
    RemoteCharacterSummary {
        id: lookup_or(item, SUMMARY_ID, UNKNOWN_ID),
        name: lookup_or(item, SUMMARY_NAME, UNNAMED_HERO),
        system: lookup_or(item, SUMMARY_SYSTEM, system_fallback),
        label: lookup_or(item, SUMMARY_LABEL, ""),
        updated_at: lookup_or(item, SUMMARY_UPDATED_AT, ""),
    }
}

pub fn normalize_summaries(body: &Value, system_fallback: &str) -> Vec<RemoteCharacterSummary> {
    extract_list(body)
        .iter()
        .map(|item| summary_from_value(item, system_fallback))
        .collect()
}

/// Normalizes a single-character response (also used for upload replies).
pub fn record_from_value(mut body: Value) -> RemoteCharacterRecord {
    let id = lookup_or(&body, RECORD_ID, UNKNOWN_ID);
    let system = body
        .get("system")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let data = body
        .as_object_mut()
        .and_then(|obj| obj.remove("data"))
        .filter(|data| !data.is_null());

    RemoteCharacterRecord { id, data, system }
}
