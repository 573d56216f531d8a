//! Runtime configuration.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chatty_stream::decoder::DEFAULT_MAX_LINE_LENGTH;
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// The name of the application, used to locate the config directory.
pub const APPLICATION: &str = "chatty";

/// Environment variable overriding `api.url`.
pub const API_URL_ENV: &str = "CHATTY_API_URL";

/// Environment variable overriding `api.key`.
pub const API_KEY_ENV: &str = "CHATTY_API_KEY";

const MAX_MODEL_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub ui: UiConfig,
    pub stream: StreamConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of an OpenAI-compatible API.
    pub url: String,

    pub key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_owned(),
            key: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub name: String,
    pub temperature: f64,

    /// Request streamed replies.
    pub stream: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_owned(),
            temperature: 0.7,
            stream: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    /// Style output with ANSI colors.
    pub colors: bool,

    /// Re-render replies as markdown once complete.
    pub markdown: bool,

    /// Syntax highlighting theme for code blocks.
    pub theme: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            colors: true,
            markdown: true,
            theme: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Longest accepted line of a streamed response, in bytes.
    pub max_line_length: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Save conversations between runs.
    pub enabled: bool,

    /// Path of the session database.
    ///
    /// Defaults to `chatty.db` in the user data directory.
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl StorageConfig {
    /// The database to use, or `None` when persistence is off or no data
    /// directory exists.
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        self.path.clone().or_else(|| {
            ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.data_dir().join("chatty.db"))
        })
    }
}

impl Config {
    /// Load the configuration file.
    ///
    /// An explicit `path` must exist. Without one, the user config directory
    /// is searched, falling back to the defaults when no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_file(path)?.ok_or_else(|| {
                Error::Config(format!("config file not found: {}", path.display()))
            });
        }

        let Some(path) = default_config_path() else {
            debug!("No config directory available, using defaults.");
            return Ok(Self::default());
        };

        Ok(Self::load_file(&path)?.unwrap_or_default())
    }

    /// Parse a config file, or `None` if it does not exist.
    fn load_file(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "Config file not found.");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        debug!(path = %path.display(), "Loading config file.");
        toml::from_str(&content).map(Some).map_err(Into::into)
    }

    /// Apply environment variable overrides.
    ///
    /// Values are trimmed, and only non-empty values win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = lookup(API_URL_ENV) {
            trace!(env = API_URL_ENV, "Overriding API URL.");
            self.api.url = url;
        }

        if let Some(key) = lookup(API_KEY_ENV) {
            trace!(env = API_KEY_ENV, "Overriding API key.");
            self.api.key = key;
        }
    }

    /// Check the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }

        Err(Error::Config(format!(
            "validation failed:\n\t• {}",
            problems.join("\n\t• ")
        )))
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = vec![];

        let url = self.api.url.trim();
        if url.is_empty() {
            problems.push("api.url: must be configured".to_owned());
        } else if !url.starts_with("http://") && !url.starts_with("https://") {
            problems.push(format!(
                "api.url: must start with http:// or https://, got {url:?}"
            ));
        }

        if self.api.key.trim().is_empty() {
            problems.push(format!(
                "api.key: must be configured (or set {API_KEY_ENV})"
            ));
        }

        let name = self.model.name.trim();
        if name.is_empty() {
            problems.push("model.name: cannot be empty".to_owned());
        } else if name.chars().count() > MAX_MODEL_NAME_LENGTH {
            problems.push(format!(
                "model.name: exceeds maximum length of {MAX_MODEL_NAME_LENGTH} characters"
            ));
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            problems.push(format!(
                "model.temperature: must be between 0.0 and 2.0, got {:.2}",
                self.model.temperature
            ));
        }

        if self.stream.max_line_length == 0 {
            problems.push("stream.max_line_length: must be greater than 0".to_owned());
        }

        if let Some(path) = &self.storage.path
            && path.is_dir()
        {
            problems.push(format!(
                "storage.path: must be a file, not a directory: {}",
                path.display()
            ));
        }

        problems
    }
}

/// The default location of the config file, if a config directory exists.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
