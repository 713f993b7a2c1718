//! Vault client error types.

use thiserror::Error;

/// Errors raised by [`VaultClient`](super::VaultClient) operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// A required identifier or document was missing. Raised before any request.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with a non-2xx status.
    #[error("Hero Vault API {status} {status_text}: {body}")]
    Remote {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server claimed JSON but sent something else.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl VaultError {
    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
