//! Centralized error types for boardsync.
//!
//! This module provides a typed error hierarchy that:
//! - Separates remote tracker, storage and board-level failures
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("GitHub API error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Board(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::GitHub(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Board-level errors raised by the assembler, sync engine and board state.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Linked repository string is not `owner/repo`.
    #[error("Invalid repository format: {0:?}")]
    InvalidRepoFormat(String),

    #[error("Remote tracker error: {0}")]
    RemoteTracker(#[from] GitHubError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// Assembled rows are inconsistent (e.g. a task row for an unseen column).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Index {index} out of range for column {column_id} ({len} tasks)")]
    IndexOutOfRange {
        column_id: String,
        index: usize,
        len: usize,
    },
}

impl BoardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity(message.into())
    }

    /// True for failures of the remote tracker (network, auth, rate limit).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteTracker(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            BoardError::InvalidRepoFormat(_) => {
                "The linked repository must look like owner/repo."
            }
            BoardError::RemoteTracker(e) => e.user_message(),
            BoardError::Persistence(e) => e.user_message(),
            BoardError::DataIntegrity(_) => {
                "The board data is inconsistent. Showing the last good board."
            }
            BoardError::Validation(_) => "Some fields are invalid. Check and try again.",
            BoardError::TaskNotFound(_) => "That task no longer exists.",
            BoardError::ColumnNotFound(_) => "That column no longer exists.",
            BoardError::ProjectNotFound(_) => "That project no longer exists.",
            BoardError::IndexOutOfRange { .. } => "The card could not be moved there.",
        }
    }
}

/// Database/storage errors (SQLite, local state).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => {
                "Unable to access local data. Try restarting the app."
            }
            DatabaseError::QueryFailed(_) => "A data operation failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "Local data may be corrupted. Consider resetting app data."
            }
            DatabaseError::MigrationFailed(_) => {
                "Failed to update local data. Try restarting the app."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// GitHub API errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Rate limited (resets at {reset_time})")]
    RateLimited { reset_time: String },

    #[error("Repository not found: {owner}/{repo}")]
    RepoNotFound { owner: String, repo: String },

    #[error("Unauthorized - token may be invalid or expired")]
    Unauthorized,

    #[error("Forbidden - insufficient permissions")]
    Forbidden,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl GitHubError {
    /// Create a GitHubError from an arbitrary message.
    /// Uses status 0 to indicate non-HTTP origin.
    pub fn message(msg: impl Into<String>) -> Self {
        GitHubError::ApiError {
            status: 0,
            message: msg.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GitHubError::RateLimited { .. } => {
                "GitHub rate limit exceeded. Please wait and try again."
            }
            GitHubError::RepoNotFound { .. } => {
                "Repository not found. Check the project's linked repository."
            }
            GitHubError::Unauthorized => "GitHub authentication failed. Check your token.",
            GitHubError::Forbidden => "You don't have permission to access this resource.",
            GitHubError::ApiError { status, .. } if *status >= 500 => {
                "GitHub is experiencing issues. Please try again later."
            }
            GitHubError::ApiError { .. } => "GitHub request failed. Please try again.",
            GitHubError::Network(_) => "Unable to reach GitHub. Check your internet connection.",
            GitHubError::NotAuthenticated => "No GitHub token configured.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
trait ReqwestErrorExt {
    fn into_github_error(self) -> GitHubError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_github_error(self) -> GitHubError {
        if self.is_timeout() {
            GitHubError::Network(format!("request timed out: {self}"))
        } else if self.is_connect() {
            GitHubError::Network(self.to_string())
        } else if let Some(status) = self.status() {
            GitHubError::ApiError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            GitHubError::message(format!("invalid response body: {self}"))
        } else {
            GitHubError::Network(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                DatabaseError::ConnectionFailed(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        err.into_database_error()
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        BoardError::Persistence(err.into_database_error())
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        err.into_github_error()
    }
}
