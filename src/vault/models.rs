//! Canonical shapes for Hero Vault payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the character list, already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCharacterSummary {
    pub id: String,
    pub name: String,
    pub system: String,
    pub label: String,
    /// ISO 8601 timestamp, or empty when the server sent none.
    pub updated_at: String,
}

/// A full character payload as returned by `GET /api/characters/{id}`.
///
/// `data` is the host document JSON. It is kept opaque and is `None` when the
/// server omitted it or sent `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCharacterRecord {
    pub id: String,
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Filters for listing characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Only characters for this game system. Empty means any.
    pub system: String,
    /// Sort key understood by the server. Empty sends no sort.
    pub sort: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            system: String::new(),
            sort: "updated".to_string(),
        }
    }
}

impl ListOptions {
    pub fn for_system(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Self::default()
        }
    }

    /// Query pairs for the non-empty filters, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if !self.system.is_empty() {
            pairs.push(("system", self.system.as_str()));
        }
        if !self.sort.is_empty() {
            pairs.push(("sort", self.sort.as_str()));
        }
        pairs
    }
}

/// Metadata attached to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub label: String,
    pub overwrite: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            label: String::new(),
            overwrite: true,
        }
    }
}

/// Body of `POST /api/characters`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRequest {
    pub name: String,
    pub system: String,
    pub label: String,
    pub overwrite: bool,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_options_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.system, "");
        assert_eq!(options.sort, "updated");
        assert_eq!(options.query_pairs(), vec![("sort", "updated")]);
    }

    #[test]
    fn test_list_options_skip_empty_fields() {
        let options = ListOptions {
            system: String::new(),
            sort: String::new(),
        };
        assert!(options.query_pairs().is_empty());

        let options = ListOptions::for_system("dnd5e");
        assert_eq!(
            options.query_pairs(),
            vec![("system", "dnd5e"), ("sort", "updated")]
        );
    }

    #[test]
    fn test_upload_options_default_overwrites() {
        let options = UploadOptions::default();
        assert!(options.overwrite);
        assert!(options.label.is_empty());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = RemoteCharacterSummary {
            id: "abc".to_string(),
            name: "Brunhild".to_string(),
            system: "dnd5e".to_string(),
            label: "".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["updatedAt"], "2024-01-01T00:00:00Z");
    }
}
