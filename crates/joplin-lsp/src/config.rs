use joplin_core::{ClientConfig, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings sent by the editor in `initializationOptions`
///
/// Every field overrides the YAML file named by `config_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspSettings {
    pub token: Option<String>,

    pub base_url: Option<String>,

    /// Editor command used to open notes
    pub opener: Option<String>,

    pub debug: Option<bool>,

    /// Optional YAML client config
    pub config_path: Option<PathBuf>,
}

impl LspSettings {
    pub fn from_options(options: Option<serde_json::Value>) -> Result<Self, serde_json::Error> {
        match options {
            Some(value) if !value.is_null() => serde_json::from_value(value),
            _ => Ok(Self::default()),
        }
    }

    /// Effective client config: file (or defaults) overlaid with these settings
    pub fn resolve(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };

        if let Some(token) = &self.token {
            config.api.token = Some(token.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(opener) = &self.opener {
            config.explorer.opener = Some(opener.clone());
        }
        if let Some(debug) = self.debug {
            config.explorer.debug = debug;
        }

        Ok(config)
    }
}
