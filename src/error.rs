use std::path::PathBuf;
use thiserror::Error;

/// Surveyor error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot access repository at {path}: {reason}")]
    RepoAccess { path: PathBuf, reason: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

/// Result type alias for Surveyor operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a repository access error
    pub fn repo_access(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::RepoAccess {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Whether this error means the repository itself could not be read
    pub fn is_repo_access(&self) -> bool {
        matches!(self, Error::RepoAccess { .. })
    }
}
