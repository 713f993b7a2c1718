//! File-backed actor store.
//!
//! Documents live one per file:
//! ```text
//! <DATA_DIR>/
//!   actors/
//!     <actor_id>.json
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{CharacterDocument, DocumentStore, EmbeddedKind, StoreError, IDENTITY_FIELD};

/// Length of generated identities.
const ID_LENGTH: usize = 16;

/// Stores character documents as pretty-printed JSON files.
#[derive(Clone, Debug)]
pub struct JsonActorStore {
    data_dir: PathBuf,
}

impl JsonActorStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn actors_dir(&self) -> PathBuf {
        self.data_dir.join("actors")
    }

    /// Path for an actor id. Rejects ids that would escape the actors dir.
    pub fn path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.actors_dir().join(format!("{}.json", id)))
    }

    fn load(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path(id)?;

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .map_err(|e| StoreError::Invalid(id.to_string(), e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }

    fn load_existing(&self, id: &str) -> Result<Map<String, Value>, StoreError> {
        match self.load(id)? {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(StoreError::Invalid(
                id.to_string(),
                "document is not an object".to_string(),
            )),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn save(&self, id: &str, document: &Map<String, Value>) -> Result<(), StoreError> {
        let dir = self.actors_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let path = self.path(id)?;
        let contents = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Invalid(id.to_string(), e.to_string()))?;
        fs::write(&path, contents).map_err(|e| StoreError::Io { path, source: e })
    }
}

/// A fresh 16-character alphanumeric identity.
pub fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LENGTH);
    id
}

/// Recursively merges `fields` into `target`. Objects merge; anything else
/// replaces.
fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                merge_fields(existing, incoming);
                continue;
            }
            target.insert(key, Value::Object(incoming));
        } else {
            target.insert(key, value);
        }
    }
}

fn take_records(document: &mut Map<String, Value>, kind: EmbeddedKind) -> Vec<Value> {
    match document.remove(kind.field()) {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    }
}

fn put_records(document: &mut Map<String, Value>, kind: EmbeddedKind, records: Vec<Value>) {
    document.insert(kind.field().to_string(), Value::Array(records));
}

fn record_id(record: &Value) -> Option<&str> {
    record.get(IDENTITY_FIELD).and_then(Value::as_str)
}

/// Gives each record an identity unique within `taken`, keeping the record's
/// own identity when it is free. Records that are not objects cannot carry
/// an identity and are dropped.
fn assign_ids(records: Vec<Value>, taken: &mut HashSet<String>) -> Vec<Value> {
    records
        .into_iter()
        .filter(|record| {
            if !record.is_object() {
                tracing::warn!("Dropping embedded record without fields: {}", record);
            }
            record.is_object()
        })
        .map(|mut record| {
            let keep = record_id(&record)
                .filter(|id| !id.is_empty() && !taken.contains(*id))
                .map(str::to_string);
            let id = keep.unwrap_or_else(generate_id);
            taken.insert(id.clone());
            if let Value::Object(map) = &mut record {
                map.insert(IDENTITY_FIELD.to_string(), Value::String(id));
            }
            record
        })
        .collect()
}

#[async_trait]
impl DocumentStore for JsonActorStore {
    async fn get(&self, id: &str) -> Result<Option<CharacterDocument>, StoreError> {
        Ok(self.load(id)?.map(CharacterDocument::new))
    }

    async fn list(&self) -> Result<Vec<CharacterDocument>, StoreError> {
        let dir = self.actors_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io { path: dir, source: e }),
        };

        let mut documents = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                if let Some(value) = self.load(id)? {
                    documents.push(CharacterDocument::new(value));
                }
            }
        }

        documents.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        Ok(documents)
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut document = self.load_existing(id)?;
        merge_fields(&mut document, fields);
        // The stored identity always wins over whatever the update carried.
        document.insert(IDENTITY_FIELD.to_string(), Value::String(id.to_string()));
        self.save(id, &document)
    }

    async fn list_embedded(
        &self,
        id: &str,
        kind: EmbeddedKind,
    ) -> Result<Vec<Value>, StoreError> {
        let document = self.load_existing(id)?;
        Ok(document
            .get(kind.field())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_embedded(
        &self,
        id: &str,
        kind: EmbeddedKind,
        ids: &[String],
    ) -> Result<(), StoreError> {
        let mut document = self.load_existing(id)?;
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut records = take_records(&mut document, kind);
        records.retain(|record| !record_id(record).is_some_and(|rid| doomed.contains(rid)));
        put_records(&mut document, kind, records);

        self.save(id, &document)
    }

    async fn create_embedded(
        &self,
        id: &str,
        kind: EmbeddedKind,
        records: Vec<Value>,
    ) -> Result<(), StoreError> {
        let mut document = self.load_existing(id)?;
        let mut collection = take_records(&mut document, kind);

        let mut taken: HashSet<String> = collection
            .iter()
            .filter_map(record_id)
            .map(str::to_string)
            .collect();
        collection.extend(assign_ids(records, &mut taken));
        put_records(&mut document, kind, collection);

        self.save(id, &document)
    }

    async fn create_document(&self, value: Value) -> Result<String, StoreError> {
        let mut document = match value {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::Invalid(
                    "<new>".to_string(),
                    "document is not an object".to_string(),
                ))
            }
        };

        let id = generate_id();
        document.insert(IDENTITY_FIELD.to_string(), Value::String(id.clone()));

        for kind in EmbeddedKind::ALL {
            let records = take_records(&mut document, kind);
            let records = assign_ids(records, &mut HashSet::new());
            put_records(&mut document, kind, records);
        }

        self.save(&id, &document)?;
        tracing::debug!("Created actor {}", id);
        Ok(id)
    }
}
