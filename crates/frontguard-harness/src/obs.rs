//! Structured lifecycle events for a corpus pass.
//!
//! Events are emitted at `info!` level unless noted; filter with `FRONTGUARD_LOG`.

use frontguard_domain::Verdict;
use tracing::{info, warn, Span};

/// Span tagging every event of a pass with its run id.
///
/// Attach with `Instrument::instrument` so it survives across awaits.
pub fn corpus_span(run_id: &str) -> Span {
    tracing::info_span!("frontguard.corpus", run_id = %run_id)
}

/// Span for one fixture.
pub fn fixture_span(fixture_id: &str) -> Span {
    tracing::info_span!("frontguard.fixture", fixture = %fixture_id)
}

pub fn emit_corpus_started(run_id: &str, root: &str, fixtures: usize, jobs: usize) {
    info!(
        event = "corpus.started",
        run_id = %run_id,
        root = %root,
        fixtures = fixtures,
        jobs = jobs,
    );
}

pub fn emit_fixture_started(fixture_id: &str, budget_secs: u64) {
    tracing::debug!(event = "fixture.started", fixture = %fixture_id, budget_secs = budget_secs);
}

/// Emit event: a verdict was produced. Failures are logged at `warn!`.
pub fn emit_fixture_verdict(verdict: &Verdict) {
    let expected = verdict.expected.map(|e| e.name()).unwrap_or("none");
    if verdict.pass {
        info!(
            event = "fixture.verdict",
            fixture = %verdict.fixture_id,
            observed = verdict.observed.name(),
            expected = expected,
            pass = true,
            duration_ms = verdict.duration_ms,
        );
    } else {
        warn!(
            event = "fixture.verdict",
            fixture = %verdict.fixture_id,
            observed = verdict.observed.name(),
            expected = expected,
            pass = false,
            flaky = verdict.flaky,
            duration_ms = verdict.duration_ms,
            detail = verdict.detail.as_deref().unwrap_or(""),
        );
    }
}

pub fn emit_corpus_finished(run_id: &str, duration_ms: u64, total: usize, regressions: usize, exit_code: i32) {
    info!(
        event = "corpus.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total = total,
        regressions = regressions,
        exit_code = exit_code,
    );
}

pub fn emit_corpus_cancelled(run_id: &str, pending: usize) {
    warn!(event = "corpus.cancelled", run_id = %run_id, pending = pending);
}

pub fn emit_duplicate_verdict(fixture_id: &str) {
    warn!(event = "fixture.duplicate_verdict", fixture = %fixture_id);
}
