//! Verdict aggregation for a corpus pass.
//!
//! Aggregation is order independent: verdicts are keyed by fixture id, so any
//! completion order produces the same report.

use crate::obs::emit_duplicate_verdict;
use chrono::{DateTime, Utc};
use frontguard_domain::{Outcome, RegressionSeverity, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Report schema version.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Append-only verdict accumulator.
///
/// Shared between workers behind a mutex; `record` is the only mutation.
#[derive(Debug, Default)]
pub struct Reporter {
    verdicts: BTreeMap<String, Verdict>,
    duplicates: Vec<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict. Returns `false` if the fixture already has one.
    pub fn record(&mut self, verdict: Verdict) -> bool {
        if self.verdicts.contains_key(&verdict.fixture_id) {
            emit_duplicate_verdict(&verdict.fixture_id);
            self.duplicates.push(verdict.fixture_id);
            return false;
        }
        self.verdicts.insert(verdict.fixture_id.clone(), verdict);
        true
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Close the pass and build the report.
    pub fn finish(self, meta: ReportMeta) -> CorpusReport {
        let mut by_outcome: BTreeMap<String, usize> = Outcome::ALL
            .iter()
            .map(|outcome| (outcome.name().to_string(), 0))
            .collect();
        let mut regressions = Vec::new();
        let mut flaky = Vec::new();
        let mut harness_errors = Vec::new();
        let mut passed = 0;

        for verdict in self.verdicts.values() {
            *by_outcome.entry(verdict.observed.name().to_string()).or_insert(0) += 1;
            if verdict.pass {
                passed += 1;
            }
            if verdict.flaky {
                flaky.push(FlakyFixture {
                    fixture_id: verdict.fixture_id.clone(),
                    expected: verdict.expected,
                    observed: verdict.observed,
                    pass: verdict.pass,
                });
            }
            if verdict.is_harness_error() {
                harness_errors.push(HarnessErrorEntry {
                    fixture_id: verdict.fixture_id.clone(),
                    detail: verdict.detail.clone().unwrap_or_default(),
                });
            }
            if let (Some(severity), Some(expected)) =
                (verdict.regression_severity(), verdict.expected)
            {
                regressions.push(Regression {
                    fixture_id: verdict.fixture_id.clone(),
                    severity,
                    expected,
                    observed: verdict.observed,
                    detail: verdict.detail.clone(),
                });
            }
        }

        let mut duplicates = self.duplicates;
        duplicates.sort();
        for fixture_id in duplicates {
            harness_errors.push(HarnessErrorEntry {
                fixture_id,
                detail: "duplicate verdict recorded".to_string(),
            });
        }

        regressions.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.fixture_id.cmp(&b.fixture_id))
        });

        let total = self.verdicts.len();
        let summary = ReportSummary {
            total,
            passed,
            failed: total - passed,
            regressions: regressions.len(),
            flaky: flaky.len(),
            harness_errors: harness_errors.len(),
            by_outcome,
        };

        CorpusReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id: meta.run_id,
            corpus_root: meta.corpus_root,
            generated_at: meta.generated_at,
            duration_ms: meta.duration_ms,
            cancelled: meta.cancelled,
            summary,
            regressions,
            flaky,
            harness_errors,
            verdicts: self.verdicts.into_values().collect(),
        }
    }
}

/// Run-level facts supplied by the corpus orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMeta {
    pub run_id: String,
    pub corpus_root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub cancelled: bool,
}

/// Counts for a corpus pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub regressions: usize,
    pub flaky: usize,
    pub harness_errors: usize,

    /// Every outcome name, including zero counts.
    pub by_outcome: BTreeMap<String, usize>,
}

/// A fixture whose observed outcome diverged from its expectation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Regression {
    pub fixture_id: String,
    pub severity: RegressionSeverity,
    pub expected: Outcome,
    pub observed: Outcome,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlakyFixture {
    pub fixture_id: String,
    pub expected: Option<Outcome>,
    pub observed: Outcome,
    pub pass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HarnessErrorEntry {
    pub fixture_id: String,
    pub detail: String,
}

/// Result of a complete corpus pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusReport {
    pub schema_version: String,
    pub run_id: String,
    pub corpus_root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub cancelled: bool,
    pub summary: ReportSummary,

    /// Most severe first, then by fixture id.
    pub regressions: Vec<Regression>,
    pub flaky: Vec<FlakyFixture>,
    pub harness_errors: Vec<HarnessErrorEntry>,

    /// Sorted by fixture id.
    pub verdicts: Vec<Verdict>,
}

impl CorpusReport {
    /// Process exit code: 1 on any regression, 2 on harness errors or cancellation, else 0.
    pub fn exit_code(&self) -> i32 {
        if !self.regressions.is_empty() {
            1
        } else if !self.harness_errors.is_empty() || self.cancelled {
            2
        } else {
            0
        }
    }

    /// No regressions, no harness errors, not cancelled.
    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Crashes where a clean diagnostic was expected.
    pub fn hard_regressions(&self) -> impl Iterator<Item = &Regression> {
        self.regressions
            .iter()
            .filter(|r| r.severity == RegressionSeverity::Critical)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.summary
            .by_outcome
            .get(outcome.name())
            .copied()
            .unwrap_or(0)
    }
}
