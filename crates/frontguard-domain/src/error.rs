//! Error types for fixture loading and directive parsing

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    #[error("no RUN directive found")]
    MissingRunLine,

    #[error("line {line}: second RUN directive (first at line {first})")]
    DuplicateRunLine { line: usize, first: usize },

    #[error("line {line}: RUN directive has no command")]
    EmptyCommand { line: usize },

    #[error("line {line}: unterminated quote in RUN directive")]
    UnterminatedQuote { line: usize },

    #[error("RUN directive ends with a line continuation")]
    DanglingContinuation,

    #[error("line {line}: unknown outcome `{value}`")]
    UnknownOutcome { line: usize, value: String },

    #[error("line {line}: invalid timeout `{value}`")]
    InvalidTimeout { line: usize, value: String },

    #[error("line {line}: duplicate {keyword} directive")]
    DuplicateDirective { line: usize, keyword: String },

    #[error("unknown substitution `%{name}`")]
    UnknownSubstitution { name: String },

    #[error("front-end substitution `%{name}` must be a whole argument, found in `{token}`")]
    EmbeddedFrontendSubstitution { name: String, token: String },

    #[error("substitution `%{name}` expands to an empty command")]
    EmptyFrontend { name: String },
}

/// Result type for fixture operations
pub type Result<T> = std::result::Result<T, FixtureError>;
