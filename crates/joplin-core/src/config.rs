use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the Joplin client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
}

/// Data API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Where the Joplin clipper service listens
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Api token from Joplin's Web Clipper options
    #[serde(default)]
    pub token: Option<String>,
}

/// Notebook explorer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Name of the explorer buffer
    #[serde(default = "default_title")]
    pub title: String,
    /// Editor command used to open a note, e.g. "vnew"
    #[serde(default)]
    pub opener: Option<String>,
    /// Show entity ids next to lines and log verbosely
    #[serde(default)]
    pub debug: bool,
}

fn default_base_url() -> String {
    "http://localhost:41184".to_string()
}

fn default_title() -> String {
    "JoplinNoteBooks Explorer".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            opener: None,
            debug: false,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            explorer: ExplorerConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ClientConfig {
    /// Load config from a specific path
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Token, if one is set and non-blank
    pub fn token(&self) -> Option<&str> {
        self.api
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
