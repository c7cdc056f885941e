//! Outcome classification: ExecutionResult × Fixture → Verdict.
//!
//! Classification priority:
//! 1. Killed by a fault signal → `Crash`
//! 2. Deadline hit, cancelled, or duration over budget → `Timeout`
//! 3. Configured crash exit code or crash marker in the output → `Crash`
//! 4. Non-zero exit with a structured-error marker → `CleanDiagnosedError`
//! 5. Exit zero → `CleanSuccess`
//! 6. Anything else → `UnclassifiedFailure`

use crate::config::{FrontendConfig, HarnessConfig};
use crate::error::{HarnessError, Result};
use frontguard_domain::{duration_millis, ExecutionResult, Fixture, Outcome, Verdict};
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

/// Compiled classification rules for one front-end.
#[derive(Debug, Clone)]
pub struct ClassifierPolicy {
    diagnostic_markers: Vec<Regex>,
    crash_markers: Vec<Regex>,
    crash_exit_codes: Vec<i32>,
    fault_signals: Vec<i32>,
}

impl ClassifierPolicy {
    /// Compile the markers of a front-end configuration.
    pub fn from_frontend(frontend: &FrontendConfig) -> Result<Self> {
        Ok(Self {
            diagnostic_markers: compile(&frontend.diagnostic_markers)?,
            crash_markers: compile(&frontend.crash_markers)?,
            crash_exit_codes: frontend.crash_exit_codes.clone(),
            fault_signals: frontend.fault_signals.clone(),
        })
    }

    /// Policy used when a fixture references no configured front-end.
    pub fn builtin() -> Result<Self> {
        Self::from_frontend(&FrontendConfig::default())
    }

    pub fn is_fault_signal(&self, signal: i32) -> bool {
        self.fault_signals.contains(&signal)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| HarnessError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Policies for every configured front-end plus the builtin fallback.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    fallback: ClassifierPolicy,
    by_frontend: BTreeMap<String, ClassifierPolicy>,
}

impl PolicyTable {
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let by_frontend = config
            .frontends
            .iter()
            .map(|(name, frontend)| -> Result<(String, ClassifierPolicy)> {
                Ok((name.clone(), ClassifierPolicy::from_frontend(frontend)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            fallback: ClassifierPolicy::builtin()?,
            by_frontend,
        })
    }

    /// Policy of the first configured front-end the fixture's RUN line references.
    pub fn for_fixture(&self, fixture: &Fixture) -> &ClassifierPolicy {
        fixture
            .directives
            .run
            .frontend_refs()
            .into_iter()
            .find_map(|name| self.by_frontend.get(name))
            .unwrap_or(&self.fallback)
    }
}

/// Map an execution to an outcome and a short explanation.
pub fn observe(
    result: &ExecutionResult,
    budget: Duration,
    policy: &ClassifierPolicy,
) -> (Outcome, String) {
    if let Some(signal) = result.signal {
        if policy.is_fault_signal(signal) {
            let core = if result.core_dumped { ", core dumped" } else { "" };
            return (
                Outcome::Crash,
                format!("killed by signal {} ({}{})", signal, signal_name(signal), core),
            );
        }
    }

    let budget_ms = duration_millis(budget);
    if result.cancelled {
        return (Outcome::Timeout, "cancelled while running".to_string());
    }
    if result.timed_out || result.duration_ms > budget_ms {
        return (
            Outcome::Timeout,
            format!("exceeded {}ms budget after {}ms", budget_ms, result.duration_ms),
        );
    }

    if let Some(code) = result.exit_code {
        if policy.crash_exit_codes.contains(&code) {
            return (
                Outcome::Crash,
                format!("exit code {} is a configured crash code", code),
            );
        }
    }

    let diagnostics = result.diagnostics();
    if let Some(marker) = policy.crash_markers.iter().find(|re| re.is_match(&diagnostics)) {
        return (
            Outcome::Crash,
            format!("output matched crash marker `{}`", marker.as_str()),
        );
    }

    if result.exited_nonzero() {
        let matched = diagnostics
            .lines()
            .find(|line| policy.diagnostic_markers.iter().any(|re| re.is_match(line)));
        let code = result.exit_code.unwrap_or(-1);
        return match matched {
            Some(line) => (
                Outcome::CleanDiagnosedError,
                format!("exit code {}: {}", code, line.trim()),
            ),
            None => (
                Outcome::UnclassifiedFailure,
                format!("exit code {} without a recognized diagnostic", code),
            ),
        };
    }

    if result.exited_zero() {
        return (Outcome::CleanSuccess, "exit code 0".to_string());
    }

    match result.signal {
        Some(signal) => (
            Outcome::UnclassifiedFailure,
            format!("killed by non-fault signal {} ({})", signal, signal_name(signal)),
        ),
        None => (
            Outcome::UnclassifiedFailure,
            "no exit status reported".to_string(),
        ),
    }
}

/// Produce the verdict for one fixture execution.
///
/// Passes iff the observed outcome equals the expected one exactly and any
/// expected diagnostic substring is present.
pub fn classify(
    result: &ExecutionResult,
    fixture: &Fixture,
    budget: Duration,
    policy: &ClassifierPolicy,
) -> Verdict {
    let (observed, observation) = observe(result, budget, policy);
    let expected = fixture.expected();

    let mut pass = observed == expected;
    let detail = if !pass {
        format!("expected {}, observed {}: {}", expected, observed, observation)
    } else {
        match fixture.expected_diagnostic() {
            Some(needle) if !result.diagnostics().contains(needle) => {
                pass = false;
                format!("{}; expected diagnostic `{}` not found", observation, needle)
            }
            _ => observation,
        }
    };

    Verdict {
        fixture_id: fixture.id.clone(),
        observed,
        expected: Some(expected),
        pass,
        flaky: fixture.is_flaky(),
        detail: Some(detail),
        duration_ms: result.duration_ms,
        exit_code: result.exit_code,
        signal: result.signal,
        source_digest: Some(fixture.source_digest.clone()),
        cancelled: result.cancelled,
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGILL => "SIGILL",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGSYS => "SIGSYS",
        libc::SIGKILL => "SIGKILL",
        libc::SIGTERM => "SIGTERM",
        libc::SIGINT => "SIGINT",
        libc::SIGPIPE => "SIGPIPE",
        _ => "unknown",
    }
}

#[cfg(not(unix))]
fn signal_name(_signal: i32) -> &'static str {
    "unknown"
}
