//! Hero Vault REST client.
//!
//! All traffic is JSON over HTTPS against three endpoints:
//!
//! | Method | Path                   | Purpose              |
//! |--------|------------------------|----------------------|
//! | GET    | `/api/characters`      | list summaries       |
//! | GET    | `/api/characters/{id}` | fetch one payload    |
//! | POST   | `/api/characters`      | upload a document    |
//!
//! Responses are normalized into the types in [`models`] so that small
//! schema drift on the server does not leak into callers.

mod client;
mod error;
pub mod models;
pub mod normalize;

pub use client::{ClientConfig, VaultClient, DEFAULT_BASE_URL};
pub use error::VaultError;
pub use models::{
    ListOptions, RemoteCharacterRecord, RemoteCharacterSummary, UploadOptions, UploadRequest,
};
