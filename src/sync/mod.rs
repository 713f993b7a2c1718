//! Import reconciliation between Hero Vault payloads and local actors.
//!
//! Import is one-directional and last-write-wins: the remote payload
//! replaces the local core fields and the full membership of each embedded
//! collection. Export needs no reconciliation and lives in [`crate::api`].

mod error;
mod reconciler;

pub use error::SyncError;
pub use reconciler::{CollectionChange, ImportResult, ReconcileOptions, Reconciler};
