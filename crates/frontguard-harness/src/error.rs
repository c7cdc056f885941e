//! Error types for harness operations

use frontguard_domain::FixtureError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("corpus root not found: {0}")]
    CorpusNotFound(PathBuf),

    #[error("failed to walk corpus: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture {fixture}: {source}")]
    Fixture {
        fixture: String,
        #[source]
        source: FixtureError,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait on front-end process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("temporary workspace error: {0}")]
    Workspace(#[source] std::io::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
