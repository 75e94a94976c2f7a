use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
///
/// Only [`DocumentParseError`] is recoverable; it is collected as a warning
/// instead of being raised through this enum.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("ingest failed: {0}")]
    Ingest(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("embedding failed: {0}")]
    Embedding(CapabilityError),

    #[error("synthesis failed: {0}")]
    Synthesis(CapabilityError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }
}

/// A single source file that could not be read or parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse {}: {reason}", path.display())]
pub struct DocumentParseError {
    pub path: PathBuf,
    pub reason: String,
}

impl DocumentParseError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

/// Errors reported by an external embedding or generation capability.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapabilityError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
