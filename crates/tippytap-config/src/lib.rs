//! Configuration management for TippyTap.
//!
//! Parses `tippytap.toml` files with serde and discovers them in the current
//! directory and its parents. CLI settings can be applied during load via
//! [`CliSettings`].
//!
//! ```toml
//! [editor]
//! debounce_ms = 300
//!
//! [sync]
//! suppression_window_ms = 100
//!
//! [diff]
//! max_lcs_cells = 1000000
//!
//! [diagrams]
//! kroki_url = "${KROKI_URL:-https://kroki.io}"
//! timeout_secs = 30
//! ```
//!
//! `diagrams.kroki_url` supports environment variable expansion:
//! `${VAR}` errors if VAR is unset, `${VAR:-default}` falls back to the
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tippytap.toml";

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override the edit debounce period.
    pub debounce_ms: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub sync: SyncConfig,
    pub diff: DiffConfig,
    pub diagrams: DiagramsConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Structured editor configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before an edit is written to the store.
    pub debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Reconciliation configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Time after our own write during which store changes count as its echo.
    pub suppression_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            suppression_window_ms: 100,
        }
    }
}

impl SyncConfig {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }
}

/// Word diff configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Largest LCS table computed before a diff falls back to replacing the
    /// whole changed middle.
    pub max_lcs_cells: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_lcs_cells: 1_000_000,
        }
    }
}

/// Diagram rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Kroki server URL. Diagrams are left as source when unset.
    pub kroki_url: Option<String>,
    /// Timeout of one render request.
    pub timeout_secs: u64,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            timeout_secs: 30,
        }
    }
}

impl DiagramsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Expand `${VAR}` and `${VAR:-default}` in `kroki_url`.
    ///
    /// A URL without `${` is kept as written, bare `$` included.
    fn expand_kroki_url(&mut self) -> Result<(), ConfigError> {
        let Some(url) = self.kroki_url.as_deref().filter(|url| url.contains("${")) else {
            return Ok(());
        };
        let expanded = shellexpand::env(url).map_err(|e| ConfigError::EnvVar {
            field: "diagrams.kroki_url".to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })?;
        self.kroki_url = Some(expanded.into_owned());
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `tippytap.toml` in the current directory and parents,
    /// falling back to defaults.
    ///
    /// CLI settings are applied after loading and take precedence over
    /// config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let discovered = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| Self::discover_from(&cwd)),
        };

        let mut config = match discovered {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams.kroki_url = Some(kroki_url.clone());
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.editor.debounce_ms = debounce_ms;
        }
    }

    /// Search for a config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.diagrams.expand_kroki_url()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.suppression_window_ms == 0 {
            return Err(ConfigError::Validation(
                "sync.suppression_window_ms must be greater than 0".to_owned(),
            ));
        }
        if self.diff.max_lcs_cells == 0 {
            return Err(ConfigError::Validation(
                "diff.max_lcs_cells must be greater than 0".to_owned(),
            ));
        }
        if let Some(kroki_url) = &self.diagrams.kroki_url {
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }
        if self.diagrams.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}
