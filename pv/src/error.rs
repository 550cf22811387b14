//! Vault error types
//!
//! One typed enum for everything the library can fail with, plus the
//! placeholder rendering used when a reference resolves to an error
//! instead of a value.

use thiserror::Error;

/// Errors from vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid metadata in '{directory}': {reason}")]
    Metadata { directory: String, reason: String },

    #[error("Sync failed for '{directory}': {reason}")]
    SyncFailed { directory: String, reason: String },

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Env var not found: {0}")]
    EnvVarNotFound(String),

    #[error("Circular reference through '{0}'")]
    CycleDetected(String),

    #[error("Error reading file: {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the vault
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Render this error as an inline placeholder value.
    ///
    /// Reference resolution substitutes these into the output map rather
    /// than failing the whole batch, so a template with one broken
    /// reference still renders the rest.
    pub fn placeholder(&self) -> String {
        match self {
            Self::EnvVarNotFound(name) => format!("<Env var not found: {}>", name),
            Self::FileRead { path, .. } => format!("<Error reading file: {}>", path),
            other => format!("<Error: {}>", other),
        }
    }
}
