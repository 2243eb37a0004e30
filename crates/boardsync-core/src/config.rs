use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub caps `per_page` at 100.
pub const MAX_PER_PAGE: u32 = 100;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub board: BoardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding projects, columns and tasks
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("boardsync")
}

fn default_database_path() -> PathBuf {
    default_config_dir().join("board.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// GitHub REST settings. The token is a personal access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Bearer token; falls back to `GITHUB_TOKEN` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for idempotent reads (listing issues and labels)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Page size when listing issues; only the first page is read
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

impl GitHubConfig {
    /// Token from the config file, or from the environment.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Check if a token is available (not a placeholder)
    pub fn is_configured(&self) -> bool {
        self.resolved_token()
            .is_some_and(|t| !t.starts_with("YOUR_"))
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            per_page: default_per_page(),
        }
    }
}

/// Board layout seeded into an empty database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_id")]
    pub board_id: i64,

    /// Column titles, left to right. The first one is the intake column.
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,

    /// Column flagged terminal when seeding; moving a linked task there closes its issue
    #[serde(default = "default_terminal_column")]
    pub terminal_column: String,
}

fn default_board_id() -> i64 {
    1
}

fn default_columns() -> Vec<String> {
    vec!["To Do".to_string(), "In Progress".to_string(), "Done".to_string()]
}

fn default_terminal_column() -> String {
    "Done".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            board_id: default_board_id(),
            default_columns: default_columns(),
            terminal_column: default_terminal_column(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            database: DatabaseConfig::default(),
            github: GitHubConfig::default(),
            board: BoardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, writing defaults if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let path = Self::config_path().map_err(|e| ConfigError::NotFound(format!("{e:#}")))?;
        Self::load_validated_from(&path)
    }

    /// Load and validate the configuration at `config_path`
    pub fn load_validated_from(
        config_path: &Path,
    ) -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let config =
            Self::load_from(config_path).map_err(|e| ConfigError::ParseError(format!("{e:#}")))?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.github.api_url, "github.api_url", &mut result);

        if self.github.timeout_secs == 0 {
            result.add_error("github.timeout_secs", "Timeout must be greater than 0");
        }

        if self.github.per_page == 0 || self.github.per_page > MAX_PER_PAGE {
            result.add_error(
                "github.per_page",
                format!("Page size must be between 1 and {MAX_PER_PAGE}"),
            );
        }

        if self.github.max_retries > 10 {
            result.add_warning("github.max_retries", "More than 10 retries is unusual");
        }

        if self.board.default_columns.is_empty() {
            result.add_error("board.default_columns", "At least one column is required");
        } else if self
            .board
            .default_columns
            .iter()
            .any(|title| title.trim().is_empty())
        {
            result.add_error("board.default_columns", "Column titles cannot be empty");
        } else if !self
            .board
            .default_columns
            .iter()
            .any(|title| title.eq_ignore_ascii_case(&self.board.terminal_column))
        {
            result.add_warning(
                "board.terminal_column",
                format!(
                    "Terminal column {:?} is not one of the default columns",
                    self.board.terminal_column
                ),
            );
        }

        if !self.github.is_configured() {
            result.add_warning(
                "github.token",
                "GitHub token not configured - sync and issue linking will fail",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("boardsync");

        Ok(config_dir.join("config.toml"))
    }
}
