//! End-to-end corpus passes against a shell-script front-end.

#![cfg(unix)]

use frontguard_harness::{
    CorpusReport, CorpusRun, FrontendConfig, HarnessConfig, Outcome, RegressionSeverity,
    CONFIG_FILE_NAME,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Behaves like a parser front-end, driven by markers in the input file.
const FAKE_FRONTEND: &str = r#"
if grep -q CRASH "$1"; then
  echo "Stack dump:" >&2
  kill -SEGV $$
fi
if grep -q HANG "$1"; then
  sleep 30
fi
if grep -q ABORTCODE "$1"; then
  echo "fatal: internal invariant violated" >&2
  exit 134
fi
if grep -q ERROR "$1"; then
  echo "$1:1:1: error: expected expression" >&2
  exit 1
fi
if grep -q GARBLED "$1"; then
  exit 3
fi
exit 0
"#;

struct Corpus {
    _tools: tempfile::TempDir,
    root: tempfile::TempDir,
    config: HarnessConfig,
}

fn corpus(files: &[(&str, &str)]) -> Corpus {
    let tools = tempfile::tempdir().unwrap();
    let script = tools.path().join("fake-frontend.sh");
    std::fs::write(&script, FAKE_FRONTEND).unwrap();

    let root = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        write(root.path(), name, contents);
    }

    let mut config = HarnessConfig {
        jobs: 2,
        ..HarnessConfig::default()
    };
    config.frontends.insert(
        "fe".to_string(),
        FrontendConfig::with_command(vec![
            "/bin/sh".to_string(),
            script.to_string_lossy().into_owned(),
        ]),
    );

    Corpus {
        _tools: tools,
        root,
        config,
    }
}

fn write(root: &Path, name: &str, contents: &str) {
    let path = root.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn not_cancelled() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[tokio::test]
async fn crash_where_diagnostic_expected_is_the_only_regression() {
    let c = corpus(&[
        ("a.swift", "// RUN: not %fe %s\n// ERROR\n"),
        ("b.swift", "// RUN: not %fe %s\n// CRASH\n"),
        ("c.swift", "// RUN: %fe %s\nlet x = 1\n"),
    ]);
    let (_tx, rx) = not_cancelled();

    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.regressions.len(), 1);
    let regression = &report.regressions[0];
    assert_eq!(regression.fixture_id, "b.swift");
    assert_eq!(regression.severity, RegressionSeverity::Critical);
    assert_eq!(regression.expected, Outcome::CleanDiagnosedError);
    assert_eq!(regression.observed, Outcome::Crash);
    assert_eq!(report.exit_code(), 1);

    let b = report.verdicts.iter().find(|v| v.fixture_id == "b.swift").unwrap();
    assert_eq!(b.signal, Some(libc::SIGSEGV));
}

#[tokio::test]
async fn fixed_crashers_pass_with_clean_diagnostics() {
    let c = corpus(&[
        ("fixed/0001.swift", "// RUN: not %fe %s\n// ERROR\n"),
        (
            "fixed/0002.swift",
            "// RUN: not %fe %s\n// EXPECTED-DIAGNOSTIC: expected expression\n// ERROR\n",
        ),
        ("crashers/0003.swift", "// RUN: not --crash %fe %s\n// CRASH\n"),
    ]);
    let (_tx, rx) = not_cancelled();

    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert!(report.regressions.is_empty(), "{:?}", report.regressions);
    assert_eq!(report.summary.passed, 3);
    assert_eq!(report.count(Outcome::Crash), 1);
    assert_eq!(report.count(Outcome::CleanDiagnosedError), 2);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn hang_is_killed_at_the_fixture_budget() {
    let c = corpus(&[(
        "hang.swift",
        "// RUN: %fe %s\n// EXPECT: timeout\n// TIMEOUT: 1\n// HANG\n",
    )]);
    let (_tx, rx) = not_cancelled();

    let start = Instant::now();
    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    let verdict = &report.verdicts[0];
    assert_eq!(verdict.observed, Outcome::Timeout);
    assert!(verdict.pass);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn missing_run_directive_is_a_harness_error() {
    let c = corpus(&[
        ("ok.swift", "// RUN: %fe %s\n"),
        ("bare.swift", "protocol P {}\n"),
    ]);
    let (_tx, rx) = not_cancelled();

    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert_eq!(report.verdicts.len(), 2);
    assert!(report.regressions.is_empty());
    assert_eq!(report.harness_errors.len(), 1);
    assert_eq!(report.harness_errors[0].fixture_id, "bare.swift");
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn unrecognized_failure_is_not_a_diagnostic() {
    let c = corpus(&[("garbled.swift", "// RUN: not %fe %s\n// GARBLED\n")]);
    let (_tx, rx) = not_cancelled();

    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert_eq!(report.verdicts[0].observed, Outcome::UnclassifiedFailure);
    assert_eq!(report.regressions.len(), 1);
    assert_eq!(report.regressions[0].severity, RegressionSeverity::Normal);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn configured_crash_exit_code_from_corpus_config() {
    let c = corpus(&[("abort.swift", "// RUN: not --crash %fe %s\n// ABORTCODE\n")]);
    write(
        c.root.path(),
        CONFIG_FILE_NAME,
        "[frontends.fe]\ncommand = [\"placeholder\"]\ncrash_exit_codes = [134]\n",
    );
    let mut config = HarnessConfig::load(&c.root.path().join(CONFIG_FILE_NAME)).unwrap();
    config.set_frontend_command("fe", c.config.frontends["fe"].command.clone());
    let (_tx, rx) = not_cancelled();

    let report = CorpusRun::run(c.root.path(), &config, rx).await.unwrap();

    let verdict = &report.verdicts[0];
    assert_eq!(verdict.observed, Outcome::Crash);
    assert_eq!(verdict.exit_code, Some(134));
    assert!(verdict.pass);
}

#[tokio::test]
async fn cancellation_stops_running_fixtures() {
    let c = corpus(&[("hang.swift", "// RUN: %fe %s\n// EXPECT: timeout\n// HANG\n")]);
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send(true);
        // keep the sender alive until the run observes the flag
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let start = Instant::now();
    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(report.cancelled);
    let verdict = &report.verdicts[0];
    assert_eq!(verdict.observed, Outcome::Timeout);
    assert_eq!(verdict.detail.as_deref(), Some("cancelled while running"));
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn cancelled_fixture_is_not_a_regression() {
    let c = corpus(&[("hang.swift", "// RUN: not %fe %s\n// HANG\n")]);
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send(true);
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let report = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    assert!(report.cancelled);
    let verdict = &report.verdicts[0];
    assert_eq!(verdict.observed, Outcome::Timeout);
    assert_eq!(verdict.expected, Some(Outcome::CleanDiagnosedError));
    assert!(verdict.cancelled);
    assert!(report.regressions.is_empty(), "{:?}", report.regressions);
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn repeated_passes_observe_the_same_outcomes() {
    let c = corpus(&[
        ("crash.swift", "// RUN: not --crash %fe %s\n// CRASH\n"),
        ("diag.swift", "// RUN: not %fe %s\n// ERROR\n"),
        ("ok.swift", "// RUN: %fe %s\nlet x = 1\n"),
    ]);

    let (_tx, rx) = not_cancelled();
    let first = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();
    let (_tx, rx) = not_cancelled();
    let second = CorpusRun::run(c.root.path(), &c.config, rx).await.unwrap();

    let observed = |report: &CorpusReport| -> Vec<(String, Outcome)> {
        report
            .verdicts
            .iter()
            .map(|v| (v.fixture_id.clone(), v.observed))
            .collect()
    };
    assert_eq!(observed(&first), observed(&second));
    assert_eq!(
        observed(&first),
        vec![
            ("crash.swift".to_string(), Outcome::Crash),
            ("diag.swift".to_string(), Outcome::CleanDiagnosedError),
            ("ok.swift".to_string(), Outcome::CleanSuccess),
        ]
    );
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.exit_code(), 0);
    assert_eq!(second.exit_code(), 0);
}
