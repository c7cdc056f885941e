//! frontguard domain model
//!
//! Defines the objects that flow through a corpus pass:
//! - Fixture: a source fragment plus the directives that say how the front-end must behave
//! - ExecutionResult: what one isolated front-end invocation did
//! - Outcome: the tagged classification of an execution (crash, timeout, clean diagnostic, ...)
//! - Verdict: observed vs. expected outcome for one fixture
//!
//! Directive parsing follows the lit convention (`// RUN: not %target-frontend %s -parse`).

pub mod directive;
pub mod error;
pub mod execution;
pub mod fixture;
pub mod outcome;
pub mod verdict;

pub use directive::{
    expand, parse_directives, tokenize, Directives, RunLine, Substitutions,
};
pub use error::{FixtureError, Result};
pub use execution::{duration_millis, ExecutionResult};
pub use fixture::{compute_source_digest, Fixture};
pub use outcome::Outcome;
pub use verdict::{RegressionSeverity, Verdict};

/// frontguard domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
