//! Error types for the governance engine
//!
//! Fatal errors only. Validation failures and gate failures are ordinary
//! values (string lists) returned by the validator and gate evaluator; they
//! never appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Fatal error raised by a single governance invocation
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// A manifest document expected on disk does not exist
    #[error("manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    /// `rollback --to-version` named a version with no archived document
    #[error("rollback target not found: no archive for version '{0}'")]
    RollbackTargetMissing(String),

    /// `rollback` without an explicit version and no previous-active manifest
    #[error("no rollback target: no previous-active manifest recorded")]
    NoRollbackTarget,

    /// JSON (de)serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<GovernanceError>,
    },
}

impl GovernanceError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}
