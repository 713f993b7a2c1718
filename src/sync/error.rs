//! Sync error types.

use thiserror::Error;

use crate::actors::StoreError;
use crate::vault::VaultError;

/// Errors that can occur while importing a character.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// A successful response lacked a field the import depends on.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The remote character belongs to a different game system.
    #[error(
        "System mismatch: remote character is for '{remote_system}' but this world runs '{local_system}'"
    )]
    SystemMismatch {
        remote_system: String,
        local_system: String,
    },

    #[error("Target actor not found: {0}")]
    TargetNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_mismatch_display() {
        let err = SyncError::SystemMismatch {
            remote_system: "dnd5e".to_string(),
            local_system: "pf2e".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("dnd5e"));
        assert!(message.contains("pf2e"));
    }

    #[test]
    fn test_vault_error_is_transparent() {
        let err: SyncError = VaultError::InvalidArgument("id".to_string()).into();
        assert_eq!(err.to_string(), "Invalid argument: id");
    }
}
