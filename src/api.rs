//! Scriptable API: export, import and listing wired to one client and store.
//!
//! The process entry point builds a single [`VaultClient`] and hands a
//! reference to every consumer through this type.

use crate::actors::{CharacterDocument, DocumentStore, StoreError, OWNER_LEVEL};
use crate::config::DEFAULT_WORLD_ID;
use crate::panel::{Notifier, VaultPanel};
use crate::sync::{ImportResult, ReconcileOptions, Reconciler, SyncError};
use crate::vault::{
    ListOptions, RemoteCharacterRecord, RemoteCharacterSummary, UploadOptions, VaultClient,
    VaultError,
};

/// Actor types offered for export.
pub const CHARACTER_TYPES: &[&str] = &["character", "pc", "hero"];

/// The local world the API acts in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub world_id: String,
    pub system_id: Option<String>,
    pub user_id: Option<String>,
    pub is_gm: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            world_id: DEFAULT_WORLD_ID.to_string(),
            system_id: None,
            user_id: None,
            is_gm: false,
        }
    }
}

/// An actor given either by identity or as a loaded document.
#[derive(Debug, Clone, PartialEq)]
pub enum ActorRef {
    Id(String),
    Document(CharacterDocument),
}

impl From<&str> for ActorRef {
    fn from(id: &str) -> Self {
        ActorRef::Id(id.to_string())
    }
}

impl From<CharacterDocument> for ActorRef {
    fn from(document: CharacterDocument) -> Self {
        ActorRef::Document(document)
    }
}

/// Export settings. A missing label means the world id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub label: Option<String>,
    pub overwrite: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            label: None,
            overwrite: true,
        }
    }
}

/// Extracts the actor id from a document UUID.
///
/// Accepts `Actor.<id>` as well as embedded paths such as
/// `Scene.<s>.Token.<t>.Actor.<id>`; the last `Type.id` pair must be an actor.
pub fn resolve_actor_uuid(uuid: &str) -> Option<&str> {
    let parts: Vec<&str> = uuid.split('.').collect();
    if parts.len() < 2 || parts.len() % 2 != 0 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    match &parts[parts.len() - 2..] {
        ["Actor", id] => Some(*id),
        _ => None,
    }
}

pub struct RealmsyncApi<'a> {
    client: &'a VaultClient,
    store: &'a dyn DocumentStore,
    env: Environment,
}

impl<'a> RealmsyncApi<'a> {
    pub fn new(client: &'a VaultClient, store: &'a dyn DocumentStore, env: Environment) -> Self {
        Self { client, store, env }
    }

    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Whether the actor may be sent to the vault: a player-character type
    /// that the current user owns (game masters own everything).
    pub fn is_export_candidate(&self, document: &CharacterDocument) -> bool {
        let character_like = document
            .actor_type()
            .is_some_and(|t| CHARACTER_TYPES.contains(&t));
        let owner =
            self.env.is_gm || document.ownership_level(self.env.user_id.as_deref()) >= OWNER_LEVEL;

        character_like && owner
    }

    pub async fn list_characters(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<RemoteCharacterSummary>, VaultError> {
        self.client.list_characters(options).await
    }

    /// Uploads an actor. The label defaults to the world id.
    pub async fn export_actor(
        &self,
        actor: ActorRef,
        options: &ExportOptions,
    ) -> Result<RemoteCharacterRecord, SyncError> {
        let document = match actor {
            ActorRef::Document(document) => document,
            ActorRef::Id(id) if id.trim().is_empty() => {
                return Err(VaultError::InvalidArgument(
                    "export_actor requires an actor or actor id".to_string(),
                )
                .into());
            }
            ActorRef::Id(id) => {
                self.resolve_actor(
                    &id,
                    format!(
                        "export_actor expected an actor or actor id, got unknown id '{}'",
                        id
                    ),
                )
                .await?
            }
        };

        let upload = UploadOptions {
            label: options
                .label
                .clone()
                .unwrap_or_else(|| self.env.world_id.clone()),
            overwrite: options.overwrite,
        };

        Ok(self.client.upload_actor(Some(&document), &upload).await?)
    }

    /// Uploads the actor a document UUID points at.
    pub async fn export_actor_by_uuid(
        &self,
        uuid: &str,
        options: &ExportOptions,
    ) -> Result<RemoteCharacterRecord, SyncError> {
        if uuid.is_empty() {
            return Err(
                VaultError::InvalidArgument("export_actor_by_uuid requires a UUID".to_string())
                    .into(),
            );
        }

        let document = self.actor_by_uuid(uuid).await?;
        self.export_actor(ActorRef::Document(document), options)
            .await
    }

    /// Loads the actor named by a plain id or, when it contains a `.`, by a
    /// document UUID.
    pub async fn find_actor(&self, reference: &str) -> Result<CharacterDocument, SyncError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(
                VaultError::InvalidArgument("an actor id or UUID is required".to_string()).into(),
            );
        }

        if reference.contains('.') {
            self.actor_by_uuid(reference).await
        } else {
            self.resolve_actor(reference, format!("Unknown actor id '{}'", reference))
                .await
        }
    }

    async fn actor_by_uuid(&self, uuid: &str) -> Result<CharacterDocument, SyncError> {
        let not_an_actor = format!("UUID does not resolve to an Actor: {}", uuid);

        let id = resolve_actor_uuid(uuid)
            .ok_or_else(|| VaultError::InvalidArgument(not_an_actor.clone()))?;
        self.resolve_actor(id, not_an_actor).await
    }

    /// Loads an actor for export. Ids the store cannot hold or does not know
    /// fail with `InvalidArgument(unresolved)`; other store errors pass through.
    async fn resolve_actor(
        &self,
        id: &str,
        unresolved: String,
    ) -> Result<CharacterDocument, SyncError> {
        match self.store.get(id).await {
            Ok(Some(document)) => Ok(document),
            Ok(None) | Err(StoreError::InvalidId(_)) => {
                Err(VaultError::InvalidArgument(unresolved).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches a vault character and imports it, onto `target` if given.
    pub async fn import_character(
        &self,
        remote_id: &str,
        target: Option<&str>,
        enforce_system: bool,
    ) -> Result<ImportResult, SyncError> {
        let remote = self.client.get_character(remote_id).await?;
        self.reconciler(enforce_system)
            .import(&remote, target)
            .await
    }

    pub fn reconciler(&self, enforce_system: bool) -> Reconciler<'a> {
        Reconciler::new(
            self.store,
            ReconcileOptions {
                local_system: self.env.system_id.clone(),
                enforce_system,
            },
        )
    }

    /// Opens the vault browser, optionally bound to a local actor.
    pub async fn open_panel(
        &self,
        actor_id: Option<&str>,
        notifier: &'a dyn Notifier,
    ) -> VaultPanel<'a> {
        let actor_name = match actor_id {
            Some(id) => match self.store.get(id).await {
                Ok(document) => document.map(|d| d.name().to_string()),
                Err(e) => {
                    tracing::warn!("Could not load actor {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        VaultPanel::new(
            self.client,
            self.store,
            self.env.clone(),
            notifier,
            actor_id.map(str::to_string),
            actor_name,
        )
    }
}
