use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User settings read from `config.toml`. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default sender for envelopes built on the command line
    #[serde(default = "default_username")]
    pub username: String,

    /// Largest frame the relay accepts, in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Longest participant name the relay accepts, in characters
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

fn default_username() -> String {
    "Anonymous".to_string()
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_max_name_len() -> usize {
    32
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: default_username(),
            max_frame_bytes: default_max_frame_bytes(),
            max_name_len: default_max_name_len(),
        }
    }
}

impl Config {
    /// `~/.config/chat-envelope/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let home_dir = std::env::home_dir().context("Could not determine home directory")?;
        Ok(home_dir.join(".config/chat-envelope/config.toml"))
    }

    /// Read the config at `path`, writing the defaults there first if the file is absent.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }
}
