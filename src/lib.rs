//! R.A.V.N. Realmsync
//!
//! Moves player character documents between a local actor store and the
//! Hero Vault REST service.

pub mod actors;
pub mod api;
pub mod config;
pub mod panel;
pub mod sync;
pub mod vault;

#[cfg(test)]
mod test_support;

pub use actors::{CharacterDocument, DocumentStore, EmbeddedKind, JsonActorStore, StoreError};
pub use api::{ActorRef, Environment, ExportOptions, RealmsyncApi};
pub use config::{Config, ConfigError, ConfigSource, ConfigValue};
pub use panel::{Notifier, PanelState, VaultPanel};
pub use sync::{ImportResult, ReconcileOptions, Reconciler, SyncError};
pub use vault::{
    ClientConfig, ListOptions, RemoteCharacterRecord, RemoteCharacterSummary, UploadOptions,
    VaultClient, VaultError, DEFAULT_BASE_URL,
};

/// Module identifier used by the host integration.
pub const MODULE_ID: &str = "ravn-realmsync";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
