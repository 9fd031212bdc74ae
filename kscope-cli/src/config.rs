use crate::{
    cli::OutputFormat,
    error::{CliError, Result},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "kscope";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default request timeout in seconds
    pub timeout_secs: u64,

    /// Output format used when a command gets no `--output`
    pub default_output: OutputFormat,

    /// Enable colored output
    pub colored: bool,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Default referer for domain-restricted embeds
    pub referer: Option<String>,

    /// Default proxy URL (supports http, https, socks5)
    pub proxy: Option<String>,

    /// Default proxy username (if proxy requires authentication)
    pub proxy_username: Option<String>,

    /// Default proxy password (if proxy requires authentication)
    pub proxy_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            default_output: OutputFormat::Pretty,
            colored: true,
            user_agent: None,
            referer: None,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config_path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Reset configuration to defaults and save. Returns the written path.
    pub fn reset(config_path: Option<&Path>) -> Result<PathBuf> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .ok_or_else(|| CliError::config("No configuration path available"))?;

        Self::default().save(&path)?;

        Ok(path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
