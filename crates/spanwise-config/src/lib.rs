use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse inline config: {source}")]
    InlineParseError { source: toml::de::Error },
}

/// What `insert_menu` does when a formatting menu is already open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuReopenPolicy {
    /// Close the open menu, then open the new one.
    #[default]
    Replace,
    /// Refuse to open a second menu.
    Reject,
}

/// Settings for the editable surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Attribute that marks a container as an editable surface.
    pub editable_attribute: String,
    /// Tag name used when fragments are serialised to markup.
    pub fragment_tag: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            editable_attribute: "contenteditable".to_string(),
            fragment_tag: "text-fragment".to_string(),
        }
    }
}

/// Settings for the formatting menu overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub reopen: MenuReopenPolicy,
    /// Tag name of the overlay container created around menu content.
    pub tag: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            reopen: MenuReopenPolicy::default(),
            tag: "div".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub menu: MenuConfig,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = Self::expand_path(config_path.as_ref())
            .unwrap_or_else(|| config_path.as_ref().to_path_buf());
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.clone(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.clone(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Parse a config from TOML text, e.g. one embedded by the host application.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::InlineParseError { source })
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/spanwise");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
