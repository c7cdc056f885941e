//! Outcome taxonomy for a single front-end invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classified result of running a fixture through the front-end.
///
/// Only the first four variants can be expected by a fixture.
/// `UnclassifiedFailure` and `HarnessError` are observations only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Exit status zero.
    CleanSuccess,

    /// Non-zero exit with a recognized structured diagnostic.
    CleanDiagnosedError,

    /// Abnormal termination (fault signal or configured crash indicator).
    Crash,

    /// Exceeded the time budget, or was cut short by cancellation.
    #[serde(alias = "hang")]
    Timeout,

    /// Non-zero exit with no recognized diagnostic.
    UnclassifiedFailure,

    /// The harness could not produce an observation.
    HarnessError,
}

impl Outcome {
    /// Every outcome, in report order.
    pub const ALL: [Outcome; 6] = [
        Outcome::CleanSuccess,
        Outcome::CleanDiagnosedError,
        Outcome::Crash,
        Outcome::Timeout,
        Outcome::UnclassifiedFailure,
        Outcome::HarnessError,
    ];

    /// Get the outcome name as used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::CleanSuccess => "clean_success",
            Outcome::CleanDiagnosedError => "clean_diagnosed_error",
            Outcome::Crash => "crash",
            Outcome::Timeout => "timeout",
            Outcome::UnclassifiedFailure => "unclassified_failure",
            Outcome::HarnessError => "harness_error",
        }
    }

    /// Whether a fixture may declare this outcome as its expectation.
    pub fn is_expectable(&self) -> bool {
        matches!(
            self,
            Outcome::CleanSuccess | Outcome::CleanDiagnosedError | Outcome::Crash | Outcome::Timeout
        )
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, Outcome::Crash)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the directive spelling of an expectable outcome.
///
/// Accepts both `clean-diagnosed-error` and `clean_diagnosed_error`; `hang` is an alias of `timeout`.
impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "clean-success" | "success" => Ok(Outcome::CleanSuccess),
            "clean-diagnosed-error" | "diagnosed-error" | "parse-error" => {
                Ok(Outcome::CleanDiagnosedError)
            }
            "crash" => Ok(Outcome::Crash),
            "timeout" | "hang" => Ok(Outcome::Timeout),
            _ => Err(s.trim().to_string()),
        }
    }
}
