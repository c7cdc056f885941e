//! Per-fixture verdicts and regression severity.

use crate::outcome::Outcome;
use serde::{Deserialize, Serialize};

/// How bad a failing verdict is.
///
/// Ordered most severe first, so sorting ascending surfaces hard regressions at the top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RegressionSeverity {
    /// Crash where a clean diagnostic was expected.
    Critical,

    /// Any other mismatch involving a crash on either side.
    High,

    /// Every other mismatch.
    Normal,
}

impl std::fmt::Display for RegressionSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// Observed vs. expected outcome for one fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub fixture_id: String,

    pub observed: Outcome,

    /// `None` when the fixture could not be loaded.
    pub expected: Option<Outcome>,

    pub pass: bool,

    /// The fixture is explicitly marked flaky.
    pub flaky: bool,

    /// Human-readable explanation of the observation or the mismatch.
    pub detail: Option<String>,

    pub duration_ms: u64,

    pub exit_code: Option<i32>,

    pub signal: Option<i32>,

    pub source_digest: Option<String>,

    /// The front-end was killed because the pass was cancelled.
    #[serde(default)]
    pub cancelled: bool,
}

impl Verdict {
    /// Verdict for a fixture the harness could not observe.
    pub fn harness_error(
        fixture_id: impl Into<String>,
        expected: Option<Outcome>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            fixture_id: fixture_id.into(),
            observed: Outcome::HarnessError,
            expected,
            pass: false,
            flaky: false,
            detail: Some(detail.into()),
            duration_ms: 0,
            exit_code: None,
            signal: None,
            source_digest: None,
            cancelled: false,
        }
    }

    /// Severity when this verdict counts as a regression.
    ///
    /// Passing verdicts, flaky fixtures, harness errors and fixtures cut short by
    /// cancellation are never regressions.
    pub fn regression_severity(&self) -> Option<RegressionSeverity> {
        if self.pass || self.flaky || self.cancelled || self.observed == Outcome::HarnessError {
            return None;
        }
        let expected = self.expected?;
        let severity = match (expected, self.observed) {
            (Outcome::CleanDiagnosedError, Outcome::Crash) => RegressionSeverity::Critical,
            (expected, observed) if expected.is_crash() || observed.is_crash() => {
                RegressionSeverity::High
            }
            _ => RegressionSeverity::Normal,
        };
        Some(severity)
    }

    pub fn is_harness_error(&self) -> bool {
        self.observed == Outcome::HarnessError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(expected: Outcome, observed: Outcome) -> Verdict {
        Verdict {
            fixture_id: "0018-rdar21524144.swift".to_string(),
            observed,
            expected: Some(expected),
            pass: expected == observed,
            flaky: false,
            detail: None,
            duration_ms: 10,
            exit_code: None,
            signal: None,
            source_digest: None,
            cancelled: false,
        }
    }

    #[test]
    fn test_crash_instead_of_diagnostic_is_critical() {
        let v = verdict(Outcome::CleanDiagnosedError, Outcome::Crash);
        assert_eq!(v.regression_severity(), Some(RegressionSeverity::Critical));
    }

    #[test]
    fn test_crash_related_mismatch_is_high() {
        let v = verdict(Outcome::CleanSuccess, Outcome::Crash);
        assert_eq!(v.regression_severity(), Some(RegressionSeverity::High));

        let v = verdict(Outcome::Crash, Outcome::CleanDiagnosedError);
        assert_eq!(v.regression_severity(), Some(RegressionSeverity::High));
    }

    #[test]
    fn test_other_mismatch_is_normal() {
        let v = verdict(Outcome::CleanSuccess, Outcome::CleanDiagnosedError);
        assert_eq!(v.regression_severity(), Some(RegressionSeverity::Normal));
    }

    #[test]
    fn test_pass_flaky_and_harness_errors_are_not_regressions() {
        assert!(verdict(Outcome::Crash, Outcome::Crash)
            .regression_severity()
            .is_none());

        let mut flaky = verdict(Outcome::CleanDiagnosedError, Outcome::Crash);
        flaky.flaky = true;
        assert!(flaky.regression_severity().is_none());

        let err = Verdict::harness_error("x.swift", None, "no RUN directive found");
        assert!(err.is_harness_error());
        assert!(!err.pass);
        assert!(err.regression_severity().is_none());
    }

    #[test]
    fn test_cancelled_fixture_is_not_a_regression() {
        let mut v = verdict(Outcome::CleanDiagnosedError, Outcome::Timeout);
        assert_eq!(v.regression_severity(), Some(RegressionSeverity::Normal));

        v.cancelled = true;
        assert!(!v.pass);
        assert!(v.regression_severity().is_none());
    }

    #[test]
    fn test_severity_ordering() {
        let mut severities = vec![
            RegressionSeverity::Normal,
            RegressionSeverity::Critical,
            RegressionSeverity::High,
        ];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                RegressionSeverity::Critical,
                RegressionSeverity::High,
                RegressionSeverity::Normal
            ]
        );
    }
}
