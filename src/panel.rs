//! Vault browser state.
//!
//! Front-end agnostic: a front end drives the panel through its actions and
//! renders [`PanelState`]. User-facing messages go through a [`Notifier`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actors::DocumentStore;
use crate::api::Environment;
use crate::sync::{ImportResult, ReconcileOptions, Reconciler, SyncError};
use crate::vault::{
    ListOptions, RemoteCharacterRecord, RemoteCharacterSummary, UploadOptions, VaultClient,
    VaultError,
};

/// Sink for user-facing messages.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// What the panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    /// Set while an action is in flight; new actions are refused meanwhile.
    pub loading: bool,
    pub error: Option<String>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub system_id: String,
    pub characters: Vec<RemoteCharacterSummary>,
    pub selected_id: Option<String>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

pub struct VaultPanel<'a> {
    client: &'a VaultClient,
    store: &'a dyn DocumentStore,
    env: Environment,
    notifier: &'a dyn Notifier,
    state: PanelState,
}

impl<'a> VaultPanel<'a> {
    pub fn new(
        client: &'a VaultClient,
        store: &'a dyn DocumentStore,
        env: Environment,
        notifier: &'a dyn Notifier,
        actor_id: Option<String>,
        actor_name: Option<String>,
    ) -> Self {
        let state = PanelState {
            actor_id,
            actor_name,
            system_id: env.system_id.clone().unwrap_or_default(),
            ..PanelState::default()
        };

        Self {
            client,
            store,
            env,
            notifier,
            state,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn has_token(&self) -> bool {
        self.client.has_token()
    }

    pub fn api_base_url(&self) -> String {
        self.client.base_url()
    }

    fn begin(&mut self) -> bool {
        if self.state.loading {
            self.notifier
                .warn("Hero Vault is busy. Wait for the current action to finish.");
            return false;
        }
        self.state.loading = true;
        self.state.error = None;
        true
    }

    fn finish(&mut self) {
        self.state.loading = false;
        self.state.error = None;
    }

    fn fail(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.state.loading = false;
        self.state.error = Some(message);
    }

    /// Reloads the character list for the world's system.
    pub async fn refresh(&mut self) -> bool {
        if !self.begin() {
            return false;
        }

        let options = ListOptions::for_system(self.state.system_id.clone());
        match self.client.list_characters(&options).await {
            Ok(characters) => {
                self.state.characters = characters;
                self.state.last_refreshed_at = Some(Utc::now());
                self.finish();
                true
            }
            Err(e) => {
                self.fail(e.to_string());
                false
            }
        }
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.state.selected_id = id.filter(|id| !id.is_empty()).map(str::to_string);
    }

    /// Imports `id` (or the selection) as a new local actor.
    pub async fn import(&mut self, id: Option<&str>) -> Option<ImportResult> {
        let id = id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| self.state.selected_id.clone());
        let Some(id) = id else {
            self.notifier
                .warn("Select a Hero Vault character to import first.");
            return None;
        };

        if !self.begin() {
            return None;
        }

        match self.fetch_and_create(&id).await {
            Ok(result) => {
                self.finish();
                self.notifier
                    .info(&format!("Imported \"{}\" from Hero Vault.", result.name()));
                Some(result)
            }
            Err(e) => {
                let message = e.to_string();
                self.notifier
                    .error(&format!("Hero Vault import failed: {}", message));
                self.fail(message);
                None
            }
        }
    }

    async fn fetch_and_create(&self, id: &str) -> Result<ImportResult, SyncError> {
        let remote = self.client.get_character(id).await?;
        let reconciler = Reconciler::new(
            self.store,
            ReconcileOptions {
                local_system: self.env.system_id.clone(),
                enforce_system: true,
            },
        );
        reconciler.import(&remote, None).await
    }

    /// Uploads the bound actor, labelled with the world id.
    pub async fn export_current(&mut self) -> Option<RemoteCharacterRecord> {
        let loaded = match &self.state.actor_id {
            Some(id) => self.store.get(id).await,
            None => Ok(None),
        };
        let document = match loaded {
            Ok(Some(document)) => document,
            Ok(None) => {
                self.notifier.warn(
                    "No actor bound to this R.A.V.N. panel. Open it from an actor's context menu.",
                );
                return None;
            }
            Err(e) => {
                if self.begin() {
                    self.export_failed(e.to_string());
                }
                return None;
            }
        };

        if !self.begin() {
            return None;
        }

        let options = UploadOptions {
            label: self.env.world_id.clone(),
            overwrite: true,
        };
        let result: Result<_, VaultError> =
            self.client.upload_actor(Some(&document), &options).await;

        match result {
            Ok(record) => {
                self.finish();
                self.notifier.info(&format!(
                    "Sent \"{}\" to Hero Vault (id={}).",
                    document.name(),
                    record.id
                ));
                Some(record)
            }
            Err(e) => {
                self.export_failed(e.to_string());
                None
            }
        }
    }

    fn export_failed(&mut self, message: String) {
        self.notifier
            .error(&format!("Hero Vault export failed: {}", message));
        self.fail(message);
    }
}
