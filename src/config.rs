//! Configuration types for the submission client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings for talking to the download server and pacing the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the download server, without a trailing slash.
    pub base_url: String,
    /// File name under which retrieved archives are delivered.
    pub archive_name: String,
    /// How long a structured result stays on screen before the page resets.
    pub structured_reset_ms: u64,
    /// How long the completion label stays after a direct archive download.
    pub binary_reset_ms: u64,
    /// Number of link fields on the form (the server reads `link-1..=link-N`).
    pub max_links: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            archive_name: "link-downloader-files.zip".to_string(),
            structured_reset_ms: 5000,
            binary_reset_ms: 2000,
            max_links: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server base URL. A trailing slash is dropped.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the delivered archive file name.
    #[must_use]
    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    /// Sets both reset delays.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_reset_delays(mut self, structured: Duration, binary: Duration) -> Self {
        self.structured_reset_ms = structured.as_millis() as u64;
        self.binary_reset_ms = binary.as_millis() as u64;
        self
    }

    /// Sets the number of link fields.
    #[must_use]
    pub const fn with_max_links(mut self, max: usize) -> Self {
        self.max_links = max;
        self
    }

    /// Display window after a structured result.
    #[must_use]
    pub const fn structured_reset_delay(&self) -> Duration {
        Duration::from_millis(self.structured_reset_ms)
    }

    /// Display window after a direct archive download.
    #[must_use]
    pub const fn binary_reset_delay(&self) -> Duration {
        Duration::from_millis(self.binary_reset_ms)
    }

    /// Joins an endpoint path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Path configuration for archive output and configuration lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory where retrieved archives are saved.
    pub output_dir: PathBuf,
    /// Directory where configuration files are read from.
    pub config_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            output_dir: PathBuf::from("."),
            config_dir: config_dir.join("link-dl"),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server and pacing configuration.
    pub client: ClientConfig,
    /// Path configuration.
    pub paths: PathConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, `config.toml` in the default
    /// config directory is used when present; otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let Some(path) = path else {
            let default_path = PathConfig::default().config_dir.join(CONFIG_FILE_NAME);
            if default_path.is_file() {
                log::debug!("Loading configuration from {}", default_path.display());
                return Self::from_file(&default_path);
            }
            return Ok(Self::default());
        };
        Self::from_file(path)
    }

    /// Parses configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Parses configuration from TOML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> crate::Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.client.base_url = config.client.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}
