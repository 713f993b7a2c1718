//! Local character documents and the store that persists them.
//!
//! A character document is the host application's actor JSON: scalar and
//! object fields at the top level, plus two embedded collections (`items`
//! and `effects`) whose members carry their own `_id`.

mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use storage::JsonActorStore;

/// Key holding a document's (or embedded record's) identity.
pub const IDENTITY_FIELD: &str = "_id";

/// Ownership level that grants full control over an actor.
pub const OWNER_LEVEL: u64 = 3;

/// Embedded collection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddedKind {
    Items,
    Effects,
}

impl EmbeddedKind {
    pub const ALL: [EmbeddedKind; 2] = [EmbeddedKind::Items, EmbeddedKind::Effects];

    /// Field name of the collection inside a document.
    pub fn field(&self) -> &'static str {
        match self {
            EmbeddedKind::Items => "items",
            EmbeddedKind::Effects => "effects",
        }
    }
}

impl std::fmt::Display for EmbeddedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

/// A character document, held as an opaque JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterDocument(Value);

/// A document split for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentParts {
    /// Every top-level field except the identity and the embedded collections.
    pub core_fields: Map<String, Value>,
    pub items: Vec<Value>,
    pub effects: Vec<Value>,
}

impl DocumentParts {
    pub fn embedded(&self, kind: EmbeddedKind) -> &[Value] {
        match kind {
            EmbeddedKind::Items => &self.items,
            EmbeddedKind::Effects => &self.effects,
        }
    }
}

impl CharacterDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(IDENTITY_FIELD).and_then(Value::as_str)
    }

    /// Display name, empty when unnamed.
    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or("")
    }

    /// Actor type (`character`, `npc`, ...), falling back to `system.type`.
    pub fn actor_type(&self) -> Option<&str> {
        self.0
            .get("type")
            .and_then(Value::as_str)
            .or_else(|| self.0.pointer("/system/type").and_then(Value::as_str))
    }

    /// Game system id recorded on the document itself, if any.
    pub fn system_id(&self) -> Option<&str> {
        self.0
            .pointer("/system/id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn embedded(&self, kind: EmbeddedKind) -> &[Value] {
        self.0
            .get(kind.field())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ownership level granted to `user_id`, or the document default.
    pub fn ownership_level(&self, user_id: Option<&str>) -> u64 {
        let ownership = match self.0.get("ownership") {
            Some(ownership) => ownership,
            None => return 0,
        };

        let user_level = user_id
            .and_then(|id| ownership.get(id))
            .and_then(Value::as_u64);
        let default_level = ownership.get("default").and_then(Value::as_u64);

        user_level.or(default_level).unwrap_or(0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Deep copy of the whole document.
    pub fn to_value(&self) -> Value {
        self.0.clone()
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Separates the embedded collections from the core fields and drops the
    /// identity. Non-object documents yield empty parts; collection members
    /// that are not objects are dropped.
    pub fn into_parts(self) -> DocumentParts {
        let mut core_fields = match self.0 {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        core_fields.remove(IDENTITY_FIELD);
        let items = take_collection(&mut core_fields, EmbeddedKind::Items);
        let effects = take_collection(&mut core_fields, EmbeddedKind::Effects);

        DocumentParts {
            core_fields,
            items,
            effects,
        }
    }
}

fn take_collection(fields: &mut Map<String, Value>, kind: EmbeddedKind) -> Vec<Value> {
    match fields.remove(kind.field()) {
        Some(Value::Array(records)) => records.into_iter().filter(Value::is_object).collect(),
        _ => Vec::new(),
    }
}

impl From<Value> for CharacterDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Errors from a [`DocumentStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Actor not found: {0}")]
    NotFound(String),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid actor id '{0}'")]
    InvalidId(String),

    #[error("Invalid actor document {0}: {1}")]
    Invalid(String, String),
}

/// Persistence primitives of the host document model.
///
/// Every call completes its write before returning; callers sequence
/// mutations of one document by awaiting each call in turn.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a document by identity.
    async fn get(&self, id: &str) -> Result<Option<CharacterDocument>, StoreError>;

    /// All stored documents.
    async fn list(&self) -> Result<Vec<CharacterDocument>, StoreError>;

    /// Merges `fields` into the document. Nested objects merge key by key;
    /// fields not mentioned are left untouched.
    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Current members of an embedded collection.
    async fn list_embedded(&self, id: &str, kind: EmbeddedKind)
        -> Result<Vec<Value>, StoreError>;

    /// Removes the embedded records with the given identities.
    async fn delete_embedded(
        &self,
        id: &str,
        kind: EmbeddedKind,
        ids: &[String],
    ) -> Result<(), StoreError>;

    /// Appends records to an embedded collection.
    async fn create_embedded(
        &self,
        id: &str,
        kind: EmbeddedKind,
        records: Vec<Value>,
    ) -> Result<(), StoreError>;

    /// Creates a new document, embedded collections included, and returns
    /// its identity.
    async fn create_document(&self, value: Value) -> Result<String, StoreError>;
}
