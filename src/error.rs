//! Unified error handling for the trendscope crate
//!
//! Analytics passes are pure and never retried, so most variants here signal
//! invalid input that must surface to the caller instead of being swallowed.
//!
//! - [`TrendscopeErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use std::io;
use thiserror::Error;

pub use crate::normalize::LexiconError;

/// Common trait for trendscope error types
pub trait TrendscopeErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record snapshot violates an input precondition
    Input,
    /// Configuration and lexicon errors
    Config,
    /// I/O errors while reading records or configuration
    Storage,
    /// Serialization errors
    Parsing,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Input => "invalid input",
            Self::Config => "configuration error",
            Self::Storage => "storage error",
            Self::Parsing => "parsing error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the trendscope crate
#[derive(Error, Debug)]
pub enum Error {
    /// Lexicon loading and validation errors
    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    /// A record in the snapshot has an invalid shape
    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    /// Two graph nodes ended up with the same id
    #[error("Graph node id collision: {0}")]
    NodeIdCollision(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TrendscopeErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true, // I/O errors are often transient
            Self::Lexicon(_)
            | Self::InvalidRecord { .. }
            | Self::NodeIdCollision(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Config(_)
            | Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRecord { .. } | Self::NodeIdCollision(_) => ErrorCategory::Input,
            Self::Lexicon(LexiconError::Read { .. }) => ErrorCategory::Storage,
            Self::Lexicon(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Toml(_) => ErrorCategory::Parsing,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create an invalid-record error
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
