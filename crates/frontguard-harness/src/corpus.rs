//! Corpus pass orchestration.

use crate::classifier::{classify, PolicyTable};
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::invoker::{FrontendInvoker, ProcessInvoker};
use crate::loader::{discover, fixture_id, load_checked};
use crate::metrics::METRICS;
use crate::obs::{
    corpus_span, emit_corpus_cancelled, emit_corpus_finished, emit_corpus_started,
    emit_fixture_started, emit_fixture_verdict, fixture_span,
};
use crate::reporter::{CorpusReport, ReportMeta, Reporter};
use chrono::Utc;
use frontguard_domain::{duration_millis, Verdict};
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Detail recorded for fixtures skipped after cancellation.
pub const CANCELLED_BEFORE_START: &str = "cancelled before start";

/// Corpus pass orchestrator.
pub struct CorpusRun;

impl CorpusRun {
    /// Run every fixture under `root` through isolated front-end processes.
    pub async fn run(
        root: &Path,
        config: &HarnessConfig,
        cancel: watch::Receiver<bool>,
    ) -> Result<CorpusReport> {
        let invoker: Arc<dyn FrontendInvoker> = Arc::new(ProcessInvoker::new(config));
        Self::run_with(root, config, invoker, cancel).await
    }

    /// Run a corpus pass with a caller-supplied invoker.
    ///
    /// Every discovered fixture gets exactly one verdict. At most
    /// `config.effective_jobs()` fixtures are in flight at once. Setting the
    /// cancellation flag terminates running fixtures and skips the rest.
    pub async fn run_with(
        root: &Path,
        config: &HarnessConfig,
        invoker: Arc<dyn FrontendInvoker>,
        cancel: watch::Receiver<bool>,
    ) -> Result<CorpusReport> {
        config.validate()?;
        let run_id = Uuid::new_v4().to_string();
        let span = corpus_span(&run_id);
        execute(root, config, invoker.as_ref(), cancel, run_id)
            .instrument(span)
            .await
    }
}

async fn execute(
    root: &Path,
    config: &HarnessConfig,
    invoker: &dyn FrontendInvoker,
    cancel: watch::Receiver<bool>,
    run_id: String,
) -> Result<CorpusReport> {
    let start = Instant::now();
    let generated_at = Utc::now();
    let policies = PolicyTable::from_config(config)?;
    let paths = discover(root, &config.extensions)?;
    let jobs = config.effective_jobs();
    let budget = config.timeout();

    emit_corpus_started(&run_id, &root.to_string_lossy(), paths.len(), jobs);
    info!(invoker = invoker.name(), "Starting corpus pass");

    let reporter = Mutex::new(Reporter::new());
    let skipped = AtomicUsize::new(0);
    {
        let reporter = &reporter;
        let skipped = &skipped;
        let policies = &policies;
        let cancel = &cancel;

        futures::stream::iter(paths.iter())
            .for_each_concurrent(jobs, |path| {
                let cancel = cancel.clone();
                let id = fixture_id(root, path);
                let span = fixture_span(&id);
                async move {
                    let verdict =
                        run_fixture(root, path, config, invoker, policies, budget, cancel).await;
                    if verdict.detail.as_deref() == Some(CANCELLED_BEFORE_START) {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    METRICS.record_outcome(verdict.observed);
                    emit_fixture_verdict(&verdict);
                    reporter.lock().await.record(verdict);
                }
                .instrument(span)
            })
            .await;
    }

    let cancelled = *cancel.borrow();
    if cancelled {
        emit_corpus_cancelled(&run_id, skipped.load(Ordering::Relaxed));
    }

    let duration_ms = duration_millis(start.elapsed());
    let report = reporter.into_inner().finish(ReportMeta {
        run_id: run_id.clone(),
        corpus_root: root.to_path_buf(),
        generated_at,
        duration_ms,
        cancelled,
    });

    METRICS.flush();
    emit_corpus_finished(
        &run_id,
        duration_ms,
        report.summary.total,
        report.regressions.len(),
        report.exit_code(),
    );
    Ok(report)
}

/// Load, execute and classify one fixture. Never fails: problems become
/// harness-error verdicts.
async fn run_fixture(
    root: &Path,
    path: &Path,
    config: &HarnessConfig,
    invoker: &dyn FrontendInvoker,
    policies: &PolicyTable,
    default_budget: Duration,
    cancel: watch::Receiver<bool>,
) -> Verdict {
    let fixture = match load_checked(root, path, config) {
        Ok(fixture) => fixture,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to load fixture");
            return Verdict::harness_error(fixture_id(root, path), None, err.to_string());
        }
    };

    if *cancel.borrow() {
        let mut verdict =
            Verdict::harness_error(fixture.id.clone(), Some(fixture.expected()), CANCELLED_BEFORE_START);
        verdict.source_digest = Some(fixture.source_digest.clone());
        return verdict;
    }

    let budget = fixture
        .directives
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(default_budget);
    emit_fixture_started(&fixture.id, budget.as_secs());

    match invoker.invoke(&fixture, budget, cancel).await {
        Ok(result) => classify(&result, &fixture, budget, policies.for_fixture(&fixture)),
        Err(err) => {
            warn!(error = %err, "Front-end invocation failed");
            let mut verdict =
                Verdict::harness_error(fixture.id.clone(), Some(fixture.expected()), err.to_string());
            verdict.source_digest = Some(fixture.source_digest.clone());
            verdict
        }
    }
}
