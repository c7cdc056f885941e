use crate::reporter::CorpusReport;
use anyhow::{Context, Result};
use frontguard_domain::Outcome;
use std::path::Path;

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &CorpusReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize corpus report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render the human-readable summary printed after a pass.
pub fn render_summary_text(report: &CorpusReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    out.push_str(&format!(
        "frontguard: {} fixtures, {} passed, {} failed in {:.1}s\n",
        summary.total,
        summary.passed,
        summary.failed,
        report.duration_ms as f64 / 1000.0
    ));
    for outcome in Outcome::ALL {
        let count = report.count(outcome);
        if count > 0 {
            out.push_str(&format!("  {:<22} {}\n", outcome.name(), count));
        }
    }

    if !report.regressions.is_empty() {
        out.push_str(&format!("\nRegressions ({}):\n", report.regressions.len()));
        for r in &report.regressions {
            out.push_str(&format!(
                "  [{}] {}: expected {}, observed {}\n",
                r.severity, r.fixture_id, r.expected, r.observed
            ));
        }
    }

    if !report.flaky.is_empty() {
        out.push_str(&format!("\nFlaky ({}):\n", report.flaky.len()));
        for f in &report.flaky {
            let status = if f.pass { "pass" } else { "fail" };
            out.push_str(&format!("  {}: observed {} ({})\n", f.fixture_id, f.observed, status));
        }
    }

    if !report.harness_errors.is_empty() {
        out.push_str(&format!("\nHarness errors ({}):\n", report.harness_errors.len()));
        for e in &report.harness_errors {
            out.push_str(&format!("  {}: {}\n", e.fixture_id, e.detail));
        }
    }

    if report.cancelled {
        out.push_str("\nRun cancelled before completion.\n");
    }
    out
}
