//! HTTP client for the Hero Vault service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::VaultError;
use super::models::{
    ListOptions, RemoteCharacterRecord, RemoteCharacterSummary, UploadOptions, UploadRequest,
};
use super::normalize::{self, UNKNOWN_SYSTEM};
use crate::actors::CharacterDocument;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://hero-vault.ravn-quest.online";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Provider = Arc<dyn Fn() -> String + Send + Sync>;

/// Where the client reads its settings from.
///
/// Token, base URL and local system id are providers rather than values: they
/// are called on every request, so a changed setting applies to the next call
/// without rebuilding the client.
#[derive(Clone)]
pub struct ClientConfig {
    token: Provider,
    base_url: Provider,
    system: Provider,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            token: Arc::new(String::new),
            base_url: Arc::new(|| DEFAULT_BASE_URL.to_string()),
            system: Arc::new(String::new),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Fixed token and base URL, for callers without a settings store.
    pub fn fixed(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let token = token.into();
        let base_url = base_url.into();
        Self::new()
            .with_token(move || token.clone())
            .with_base_url(move || base_url.clone())
    }

    pub fn with_token<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.token = Arc::new(provider);
        self
    }

    pub fn with_base_url<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.base_url = Arc::new(provider);
        self
    }

    /// Local game system id, used when a payload does not name its own.
    pub fn with_system<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.system = Arc::new(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &(self.base_url)())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Hero Vault REST client.
///
/// Create one per process and share it by reference; the underlying
/// `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl VaultClient {
    pub fn new(config: ClientConfig) -> Result<Self, VaultError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Current base URL with trailing slashes removed.
    pub fn base_url(&self) -> String {
        let raw = (self.config.base_url)();
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Current API token, empty when none is configured.
    pub fn token(&self) -> String {
        (self.config.token)().trim().to_string()
    }

    pub fn has_token(&self) -> bool {
        !self.token().is_empty()
    }

    fn local_system(&self) -> String {
        (self.config.system)().trim().to_string()
    }

    /// Lists the current user's characters.
    ///
    /// Accepts a bare array, `{characters: [...]}` or `{results: [...]}`;
    /// any other shape yields an empty list.
    pub async fn list_characters(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<RemoteCharacterSummary>, VaultError> {
        let query = options
            .query_pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let path = if query.is_empty() {
            "/api/characters".to_string()
        } else {
            format!("/api/characters?{}", query)
        };

        let body = self.request::<()>(Method::GET, &path, None).await?;

        let system_fallback = if !options.system.is_empty() {
            options.system.clone()
        } else {
            let local = self.local_system();
            if local.is_empty() {
                UNKNOWN_SYSTEM.to_string()
            } else {
                local
            }
        };

        let characters = normalize::normalize_summaries(&body, &system_fallback);
        tracing::debug!("Listed {} character(s)", characters.len());
        Ok(characters)
    }

    /// Fetches one character payload.
    pub async fn get_character(&self, id: &str) -> Result<RemoteCharacterRecord, VaultError> {
        if id.is_empty() {
            return Err(VaultError::InvalidArgument(
                "get_character requires a character id".to_string(),
            ));
        }

        let path = format!("/api/characters/{}", urlencoding::encode(id));
        let body = self.request::<()>(Method::GET, &path, None).await?;
        Ok(normalize::record_from_value(body))
    }

    /// Uploads a full copy of `document`.
    pub async fn upload_actor(
        &self,
        document: Option<&CharacterDocument>,
        options: &UploadOptions,
    ) -> Result<RemoteCharacterRecord, VaultError> {
        let document = document.ok_or_else(|| {
            VaultError::InvalidArgument("upload_actor requires a character document".to_string())
        })?;

        let body = self.upload_request(document, options);
        tracing::info!(
            "Uploading \"{}\" (system={}, label={:?}, overwrite={})",
            body.name,
            body.system,
            body.label,
            body.overwrite
        );

        let response = self
            .request(Method::POST, "/api/characters", Some(&body))
            .await?;
        Ok(normalize::record_from_value(response))
    }

    fn upload_request(&self, document: &CharacterDocument, options: &UploadOptions) -> UploadRequest {
        let system = match document.system_id() {
            Some(system) => system.to_string(),
            None => {
                let local = self.local_system();
                if local.is_empty() {
                    UNKNOWN_SYSTEM.to_string()
                } else {
                    local
                }
            }
        };

        UploadRequest {
            name: document.name().to_string(),
            system,
            label: options.label.clone(),
            overwrite: options.overwrite,
            data: document.to_value(),
        }
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, VaultError> {
        let url = format!("{}{}", self.base_url(), path);
        tracing::debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        let token = self.token();
        if !token.is_empty() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            let body = match response.text().await {
                Ok(text) => text,
                Err(_) => status_text.clone(),
            };
            tracing::warn!("{} {} failed with {}", method, url, status);
            return Err(VaultError::Remote {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        // Endpoints without a payload (204 and friends) count as an empty object.
        if !is_json {
            return Ok(Value::Object(Map::new()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| VaultError::Decode(e.to_string()))
    }
}
