use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::Environment;
use crate::vault::{ClientConfig, DEFAULT_BASE_URL};

/// World id used when none is configured.
pub const DEFAULT_WORLD_ID: &str = "foundry-world";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// The local world the actors belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World id, used as the default export label
    pub id: String,
    /// Game system id of the world (e.g. "dnd5e"); empty if unknown
    pub system: String,
    /// User whose ownership is checked before export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Game masters may export any actor
    pub is_gm: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_WORLD_ID.to_string(),
            system: String::new(),
            user_id: None,
            is_gm: false,
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Personal Hero Vault API token
    pub api_token: ConfigValue<String>,
    /// Hero Vault base URL
    pub api_base_url: ConfigValue<String>,
    /// Directory holding the local actor store
    pub data_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Local world settings
    pub world: WorldConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api_token: Option<String>,
    api_base_url: Option<String>,
    data_dir: Option<PathBuf>,
    world: Option<WorldConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut api_token = ConfigValue::new(String::new(), ConfigSource::Default);
        let mut api_base_url =
            ConfigValue::new(DEFAULT_BASE_URL.to_string(), ConfigSource::Default);
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut config_file = None;
        let mut world = WorldConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(token) = file_config.api_token {
                api_token = ConfigValue::new(token.trim().to_string(), ConfigSource::File);
            }
            if let Some(url) = file_config.api_base_url {
                api_base_url = ConfigValue::new(url.trim().to_string(), ConfigSource::File);
            }
            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(world_config) = file_config.world {
                world = world_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(token) = std::env::var("RAVN_API_TOKEN") {
            api_token = ConfigValue::new(token.trim().to_string(), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("RAVN_API_BASE_URL") {
            api_base_url = ConfigValue::new(url.trim().to_string(), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("RAVN_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(world_id) = std::env::var("RAVN_WORLD_ID") {
            world.id = world_id;
        }
        if let Ok(system) = std::env::var("RAVN_SYSTEM") {
            world.system = system;
        }

        world.id = world.id.trim().to_string();
        world.system = world.system.trim().to_string();
        if world.id.is_empty() {
            world.id = DEFAULT_WORLD_ID.to_string();
        }

        Ok(Self {
            api_token,
            api_base_url,
            data_dir,
            config_file,
            world,
        })
    }

    /// The local world as seen by the API layer.
    pub fn environment(&self) -> Environment {
        Environment {
            world_id: self.world.id.clone(),
            system_id: Some(self.world.system.clone()).filter(|s| !s.is_empty()),
            user_id: self.world.user_id.clone(),
            is_gm: self.world.is_gm,
        }
    }

    /// Token with everything past the first four characters hidden.
    pub fn masked_token(&self) -> String {
        let token = &self.api_token.value;
        if token.is_empty() {
            return String::new();
        }
        let visible: String = token.chars().take(4).collect();
        format!("{}…", visible)
    }

    /// Client settings that re-read the configuration on every request.
    ///
    /// A failed reload falls back to defaults (no token, default base URL).
    pub fn live_client_config(config_path: Option<PathBuf>) -> ClientConfig {
        let token_path = config_path.clone();
        let url_path = config_path.clone();
        let system_path = config_path;

        ClientConfig::new()
            .with_token(move || {
                reload(&token_path)
                    .map(|c| c.api_token.value)
                    .unwrap_or_default()
            })
            .with_base_url(move || {
                reload(&url_path)
                    .map(|c| c.api_base_url.value)
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            })
            .with_system(move || {
                reload(&system_path)
                    .map(|c| c.world.system)
                    .unwrap_or_default()
            })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/ravn/
    /// - macOS: ~/Library/Application Support/ravn/
    /// - Windows: %APPDATA%/ravn/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ravn")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/ravn/
    /// - macOS: ~/Library/Application Support/ravn/
    /// - Windows: %APPDATA%/ravn/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ravn")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn reload(config_path: &Option<PathBuf>) -> Option<Config> {
    match Config::load(config_path.clone()) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Could not reload configuration: {}", e);
            None
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
