//! Applies a remote character payload to the local actor store.
//!
//! Two paths:
//!
//! - **create**: no target given; the whole payload becomes a new actor.
//! - **overwrite**: the target keeps its identity, its core fields are
//!   merged with the payload's, and each embedded collection is emptied and
//!   refilled from the payload.
//!
//! Steps run one after another. A failing step stops the import; steps that
//! already ran are not rolled back.

use serde_json::Value;

use super::error::SyncError;
use crate::actors::{CharacterDocument, DocumentStore, EmbeddedKind, IDENTITY_FIELD};
use crate::vault::RemoteCharacterRecord;

/// Import settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Game system of the local world, if known.
    pub local_system: Option<String>,
    /// Refuse to overwrite when the remote payload names a different system.
    pub enforce_system: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            local_system: None,
            enforce_system: true,
        }
    }
}

/// Membership change of one embedded collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionChange {
    pub removed: usize,
    pub added: usize,
}

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    Created {
        id: String,
        name: String,
    },
    Overwritten {
        id: String,
        name: String,
        items: CollectionChange,
        effects: CollectionChange,
    },
}

impl ImportResult {
    /// Identity of the local actor that now holds the payload.
    pub fn id(&self) -> &str {
        match self {
            ImportResult::Created { id, .. } | ImportResult::Overwritten { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ImportResult::Created { name, .. } | ImportResult::Overwritten { name, .. } => name,
        }
    }
}

/// Request-scoped importer bound to a store.
pub struct Reconciler<'a> {
    store: &'a dyn DocumentStore,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn DocumentStore, options: ReconcileOptions) -> Self {
        Self { store, options }
    }

    /// Imports `remote` as a new actor, or onto `target` when given.
    pub async fn import(
        &self,
        remote: &RemoteCharacterRecord,
        target: Option<&str>,
    ) -> Result<ImportResult, SyncError> {
        let data = remote.data.as_ref().ok_or_else(|| {
            SyncError::PreconditionFailed(format!(
                "remote character {} has no data payload",
                remote.id
            ))
        })?;

        match target {
            Some(target) => self.overwrite(remote, data, target).await,
            None => self.create(data).await,
        }
    }

    async fn create(&self, data: &Value) -> Result<ImportResult, SyncError> {
        let document = CharacterDocument::new(data.clone());
        let name = document.name().to_string();

        let id = self.store.create_document(document.into_value()).await?;
        tracing::info!("Imported \"{}\" as new actor {}", name, id);

        Ok(ImportResult::Created { id, name })
    }

    async fn overwrite(
        &self,
        remote: &RemoteCharacterRecord,
        data: &Value,
        target: &str,
    ) -> Result<ImportResult, SyncError> {
        // Nothing may be written before this check passes.
        self.check_system(remote)?;

        if self.store.get(target).await?.is_none() {
            return Err(SyncError::TargetNotFound(target.to_string()));
        }

        // Work on a private copy so the caller's record is never mutated.
        let document = CharacterDocument::new(data.clone());
        let name = document.name().to_string();
        let parts = document.into_parts();
        tracing::info!(
            "Overwriting actor {} with \"{}\" ({} item(s), {} effect(s))",
            target,
            name,
            parts.items.len(),
            parts.effects.len()
        );

        self.store
            .update(target, parts.core_fields)
            .await
            .inspect_err(|e| {
                tracing::warn!("Import into {} stopped at core fields: {}", target, e)
            })?;

        let items = self
            .replace_embedded(target, EmbeddedKind::Items, parts.items)
            .await?;
        let effects = self
            .replace_embedded(target, EmbeddedKind::Effects, parts.effects)
            .await?;

        Ok(ImportResult::Overwritten {
            id: target.to_string(),
            name,
            items,
            effects,
        })
    }

    fn check_system(&self, remote: &RemoteCharacterRecord) -> Result<(), SyncError> {
        if !self.options.enforce_system {
            return Ok(());
        }

        let local = self
            .options
            .local_system
            .as_deref()
            .filter(|s| !s.is_empty());

        match (remote.system.as_deref(), local) {
            (Some(remote_system), Some(local_system)) if remote_system != local_system => {
                Err(SyncError::SystemMismatch {
                    remote_system: remote_system.to_string(),
                    local_system: local_system.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Deletes every current member of the collection, then inserts `records`.
    async fn replace_embedded(
        &self,
        target: &str,
        kind: EmbeddedKind,
        records: Vec<Value>,
    ) -> Result<CollectionChange, SyncError> {
        let existing: Vec<String> = self
            .store
            .list_embedded(target, kind)
            .await?
            .iter()
            .filter_map(|record| record.get(IDENTITY_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let mut change = CollectionChange::default();

        if !existing.is_empty() {
            self.store
                .delete_embedded(target, kind, &existing)
                .await
                .inspect_err(|e| {
                    tracing::warn!("Import into {} stopped deleting {}: {}", target, kind, e)
                })?;
            change.removed = existing.len();
        }

        if !records.is_empty() {
            let count = records.len();
            self.store
                .create_embedded(target, kind, records)
                .await
                .inspect_err(|e| {
                    tracing::warn!("Import into {} stopped creating {}: {}", target, kind, e)
                })?;
            change.added = count;
        }

        tracing::debug!(
            "Replaced {} on {}: -{} +{}",
            kind,
            target,
            change.removed,
            change.added
        );
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{JsonActorStore, StoreError};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn test_store() -> (JsonActorStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonActorStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    async fn local_actor(store: &JsonActorStore) -> String {
        store
            .create_document(json!({
                "name": "Brunhild",
                "type": "character",
                "img": "brunhild.png",
                "system": {"hp": {"value": 3, "max": 20}},
                "items": [
                    {"_id": "old1", "name": "Club"},
                    {"_id": "old2", "name": "Torch"},
                    {"_id": "old3", "name": "Rations"}
                ],
                "effects": [{"_id": "oldfx", "label": "Poisoned"}]
            }))
            .await
            .unwrap()
    }

    fn remote(system: Option<&str>) -> RemoteCharacterRecord {
        RemoteCharacterRecord {
            id: "vault-1".to_string(),
            system: system.map(str::to_string),
            data: Some(json!({
                "_id": "remote-actor-id",
                "name": "Brunhild the Bold",
                "type": "character",
                "system": {"hp": {"value": 20}},
                "items": [
                    {"_id": "new1", "name": "Greataxe"},
                    {"_id": "new2", "name": "Shield"}
                ],
                "effects": [{"_id": "newfx", "label": "Blessed"}]
            })),
        }
    }

    fn options(local: &str) -> ReconcileOptions {
        ReconcileOptions {
            local_system: Some(local.to_string()),
            enforce_system: true,
        }
    }

    fn item_ids(doc: &CharacterDocument, kind: EmbeddedKind) -> Vec<String> {
        doc.embedded(kind)
            .iter()
            .map(|r| r["_id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_overwrite_replaces_collections() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;

        let result = Reconciler::new(&store, options("dnd5e"))
            .import(&remote(Some("dnd5e")), Some(&target))
            .await
            .unwrap();

        assert_eq!(
            result,
            ImportResult::Overwritten {
                id: target.clone(),
                name: "Brunhild the Bold".to_string(),
                items: CollectionChange {
                    removed: 3,
                    added: 2
                },
                effects: CollectionChange {
                    removed: 1,
                    added: 1
                },
            }
        );

        let doc = store.get(&target).await.unwrap().unwrap();
        assert_eq!(item_ids(&doc, EmbeddedKind::Items), vec!["new1", "new2"]);
        assert_eq!(item_ids(&doc, EmbeddedKind::Effects), vec!["newfx"]);
    }

    #[tokio::test]
    async fn test_overwrite_preserves_target_identity() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;

        Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(None), Some(&target))
            .await
            .unwrap();

        let doc = store.get(&target).await.unwrap().unwrap();
        assert_eq!(doc.id(), Some(target.as_str()));
        assert!(store.get("remote-actor-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_merges_core_fields() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;

        Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(None), Some(&target))
            .await
            .unwrap();

        let doc = store.get(&target).await.unwrap().unwrap();
        let value = doc.as_value();
        assert_eq!(value["name"], "Brunhild the Bold");
        assert_eq!(value["system"]["hp"]["value"], 20);
        // Untouched by the payload.
        assert_eq!(value["system"]["hp"]["max"], 20);
        assert_eq!(value["img"], "brunhild.png");
    }

    #[tokio::test]
    async fn test_system_mismatch_leaves_target_unchanged() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;
        let before = store.get(&target).await.unwrap().unwrap();

        let err = Reconciler::new(&store, options("pf2e"))
            .import(&remote(Some("dnd5e")), Some(&target))
            .await
            .unwrap_err();

        match err {
            SyncError::SystemMismatch {
                remote_system,
                local_system,
            } => {
                assert_eq!(remote_system, "dnd5e");
                assert_eq!(local_system, "pf2e");
            }
            other => panic!("expected system mismatch, got {:?}", other),
        }

        let after = store.get(&target).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_system_check_can_be_disabled() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;

        let result = Reconciler::new(
            &store,
            ReconcileOptions {
                local_system: Some("pf2e".to_string()),
                enforce_system: false,
            },
        )
        .import(&remote(Some("dnd5e")), Some(&target))
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_system_check_needs_both_sides() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;

        // Remote declares a system, local does not.
        Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(Some("dnd5e")), Some(&target))
            .await
            .unwrap();

        // Local declares a system, remote does not.
        Reconciler::new(&store, options("pf2e"))
            .import(&remote(None), Some(&target))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_data_is_precondition_failure() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;
        let record = RemoteCharacterRecord {
            id: "vault-1".to_string(),
            data: None,
            system: None,
        };

        let reconciler = Reconciler::new(&store, ReconcileOptions::default());
        let err = reconciler.import(&record, Some(&target)).await.unwrap_err();
        assert!(matches!(err, SyncError::PreconditionFailed(_)));

        let err = reconciler.import(&record, None).await.unwrap_err();
        assert!(matches!(err, SyncError::PreconditionFailed(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let (store, _temp) = test_store();
        let err = Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(None), Some("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_embeds_collections() {
        let (store, _temp) = test_store();
        let record = remote(Some("dnd5e"));

        let result = Reconciler::new(&store, options("pf2e"))
            .import(&record, None)
            .await
            .unwrap();

        let ImportResult::Created { id, name } = result else {
            panic!("expected a created actor");
        };
        assert_eq!(name, "Brunhild the Bold");
        assert_ne!(id, "remote-actor-id");

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(item_ids(&doc, EmbeddedKind::Items), vec!["new1", "new2"]);
        assert_eq!(item_ids(&doc, EmbeddedKind::Effects), vec!["newfx"]);

        // The caller's record is untouched.
        assert_eq!(record.data.unwrap()["_id"], "remote-actor-id");
    }

    #[tokio::test]
    async fn test_empty_remote_collections_clear_target() {
        let (store, _temp) = test_store();
        let target = local_actor(&store).await;
        let record = RemoteCharacterRecord {
            id: "vault-2".to_string(),
            data: Some(json!({"name": "Bare"})),
            system: None,
        };

        let result = Reconciler::new(&store, ReconcileOptions::default())
            .import(&record, Some(&target))
            .await
            .unwrap();

        let ImportResult::Overwritten { items, effects, .. } = result else {
            panic!("expected an overwrite");
        };
        assert_eq!(items, CollectionChange { removed: 3, added: 0 });
        assert_eq!(effects, CollectionChange { removed: 1, added: 0 });

        let doc = store.get(&target).await.unwrap().unwrap();
        assert!(doc.embedded(EmbeddedKind::Items).is_empty());
        assert!(doc.embedded(EmbeddedKind::Effects).is_empty());
    }

    /// Store that records calls and can fail on the effect insert.
    struct RecordingStore {
        inner: JsonActorStore,
        calls: Mutex<Vec<String>>,
        fail_effect_insert: bool,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn get(&self, id: &str) -> Result<Option<CharacterDocument>, StoreError> {
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<CharacterDocument>, StoreError> {
            self.inner.list().await
        }

        async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push("update".to_string());
            self.inner.update(id, fields).await
        }

        async fn list_embedded(
            &self,
            id: &str,
            kind: EmbeddedKind,
        ) -> Result<Vec<Value>, StoreError> {
            self.inner.list_embedded(id, kind).await
        }

        async fn delete_embedded(
            &self,
            id: &str,
            kind: EmbeddedKind,
            ids: &[String],
        ) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(format!("delete {}", kind));
            self.inner.delete_embedded(id, kind, ids).await
        }

        async fn create_embedded(
            &self,
            id: &str,
            kind: EmbeddedKind,
            records: Vec<Value>,
        ) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(format!("create {}", kind));
            if self.fail_effect_insert && kind == EmbeddedKind::Effects {
                return Err(StoreError::Invalid(id.to_string(), "disk full".to_string()));
            }
            self.inner.create_embedded(id, kind, records).await
        }

        async fn create_document(&self, value: Value) -> Result<String, StoreError> {
            self.inner.create_document(value).await
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let (inner, _temp) = test_store();
        let target = local_actor(&inner).await;
        let store = RecordingStore {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_effect_insert: false,
        };

        Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(None), Some(&target))
            .await
            .unwrap();

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![
                "update",
                "delete items",
                "create items",
                "delete effects",
                "create effects"
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_mid_sequence_keeps_applied_steps() {
        let (inner, _temp) = test_store();
        let target = local_actor(&inner).await;
        let store = RecordingStore {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_effect_insert: true,
        };

        let err = Reconciler::new(&store, ReconcileOptions::default())
            .import(&remote(None), Some(&target))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));

        // Core fields and items were applied, old effects were deleted,
        // new effects never arrived.
        let doc = store.get(&target).await.unwrap().unwrap();
        assert_eq!(doc.name(), "Brunhild the Bold");
        assert_eq!(item_ids(&doc, EmbeddedKind::Items), vec!["new1", "new2"]);
        assert!(doc.embedded(EmbeddedKind::Effects).is_empty());
    }
}
