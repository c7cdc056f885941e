//! frontguard - front-end crash regression harness CLI
//!
//! ## Commands
//!
//! - `run`: Execute every fixture in a corpus and report regressions
//! - `list`: Show discovered fixtures and their expected outcomes

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use frontguard_domain::tokenize;
use frontguard_harness::{
    discover, fixture_id, init_tracing, load_checked, render_summary_text, write_report_json,
    CorpusRun, HarnessConfig, CONFIG_FILE_NAME,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Level};

#[derive(Parser)]
#[command(name = "frontguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Front-end crash regression harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every fixture in a corpus
    ///
    /// Exits 0 when every fixture passes, 1 on any regression and 2 on
    /// harness errors or cancellation.
    Run(RunArgs),

    /// List fixtures and their expected outcomes without running them
    List(CorpusArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// Corpus directory
    corpus: PathBuf,

    /// Config file (default: <corpus>/frontguard.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Time budget per fixture in seconds
    #[arg(long, env = "FRONTGUARD_TIMEOUT")]
    timeout: Option<u64>,

    /// Concurrent fixtures (default: available parallelism)
    #[arg(short, long, env = "FRONTGUARD_JOBS")]
    jobs: Option<usize>,

    /// Front-end command for a `%NAME` substitution, e.g. `target-swift-frontend=swiftc -frontend`
    #[arg(long = "frontend", value_name = "NAME=COMMAND", value_parser = parse_frontend)]
    frontends: Vec<FrontendOverride>,

    /// Write the full report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
struct FrontendOverride {
    name: String,
    command: Vec<String>,
}

fn parse_frontend(raw: &str) -> std::result::Result<FrontendOverride, String> {
    let (name, command) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COMMAND, got `{}`", raw))?;
    let name = name.trim().trim_start_matches('%');
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!("`{}` is not a valid front-end name", name));
    }
    let command = tokenize(command).ok_or_else(|| "unterminated quote in command".to_string())?;
    if command.is_empty() {
        return Err(format!("front-end `{}` has an empty command", name));
    }
    Ok(FrontendOverride {
        name: name.to_string(),
        command,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(&args).await,
        Commands::List(args) => cmd_list(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!(error = %format!("{:#}", err), "frontguard failed");
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Load the config file, then apply command-line overrides.
fn resolve_config(corpus: &CorpusArgs, run: Option<&RunArgs>) -> Result<HarnessConfig> {
    let mut config = match &corpus.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let default = corpus.corpus.join(CONFIG_FILE_NAME);
            if default.is_file() {
                debug!(path = %default.display(), "Using corpus config");
                HarnessConfig::load(&default)
                    .with_context(|| format!("Failed to load config {}", default.display()))?
            } else {
                HarnessConfig::default()
            }
        }
    };

    if let Some(run) = run {
        if let Some(timeout) = run.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(jobs) = run.jobs {
            config.jobs = jobs;
        }
        for frontend in &run.frontends {
            config.set_frontend_command(&frontend.name, frontend.command.clone());
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_run(args: &RunArgs) -> Result<u8> {
    let config = resolve_config(&args.corpus, Some(args))?;
    let root = &args.corpus.corpus;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling corpus pass");
            let _ = cancel_tx.send(true);
        }
    });

    let report = CorpusRun::run(root, &config, cancel_rx)
        .await
        .with_context(|| format!("Corpus pass over {} failed", root.display()))?;

    print!("{}", render_summary_text(&report));

    if let Some(path) = &args.report_json {
        write_report_json(path, &report)?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    Ok(exit_code(report.exit_code()))
}

fn cmd_list(args: &CorpusArgs) -> Result<u8> {
    let config = resolve_config(args, None)?;
    let lines = list_fixtures(&args.corpus, &config)?;
    let failed = lines.iter().filter(|line| line.starts_with("error")).count();
    for line in &lines {
        println!("{}", line);
    }
    println!("{} fixtures, {} failed to load", lines.len(), failed);
    Ok(if failed > 0 { 2 } else { 0 })
}

/// One line per fixture: expected outcome and id, or the load error.
fn list_fixtures(root: &Path, config: &HarnessConfig) -> Result<Vec<String>> {
    let paths = discover(root, &config.extensions)
        .with_context(|| format!("Failed to discover fixtures in {}", root.display()))?;
    let lines = paths
        .iter()
        .map(|path| match load_checked(root, path, config) {
            Ok(fixture) => {
                let flaky = if fixture.is_flaky() { " (flaky)" } else { "" };
                format!("{:<22} {}{}", fixture.expected().name(), fixture.id, flaky)
            }
            Err(err) => format!("error {}: {}", fixture_id(root, path), err),
        })
        .collect();
    Ok(lines)
}

fn exit_code(code: i32) -> u8 {
    match code {
        0 => 0,
        1 => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["frontguard"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            Commands::List(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_frontend() {
        let parsed = parse_frontend("target-swift-frontend=swiftc -frontend").unwrap();
        assert_eq!(parsed.name, "target-swift-frontend");
        assert_eq!(parsed.command, vec!["swiftc", "-frontend"]);

        let quoted = parse_frontend("%fe=\"/opt/my tools/fe\" -parse").unwrap();
        assert_eq!(quoted.name, "fe");
        assert_eq!(quoted.command, vec!["/opt/my tools/fe", "-parse"]);
    }

    #[test]
    fn test_parse_frontend_rejects_malformed() {
        assert!(parse_frontend("no-equals-sign").is_err());
        assert!(parse_frontend("=swiftc").is_err());
        assert!(parse_frontend("fe=").is_err());
        assert!(parse_frontend("fe=\"unterminated").is_err());
        assert!(parse_frontend("bad name=swiftc").is_err());
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let args = run_args(&[
            "run",
            "validation-test",
            "--timeout",
            "5",
            "--jobs",
            "3",
            "--frontend",
            "fe=swiftc -frontend",
            "--report-json",
            "out.json",
        ]);
        assert_eq!(args.corpus.corpus, PathBuf::from("validation-test"));
        assert_eq!(args.timeout, Some(5));
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.frontends.len(), 1);
        assert_eq!(args.report_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["frontguard", "list", "corpus", "--verbose", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.json);
    }

    #[test]
    fn test_resolve_config_reads_corpus_file_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "timeout_secs = 12\njobs = 8\n[frontends.fe]\ncommand = [\"old\"]\ncrash_exit_codes = [134]\n",
        )
        .unwrap();
        let corpus = dir.path().to_string_lossy().into_owned();
        let args = run_args(&["run", &corpus, "--jobs", "2", "--frontend", "fe=new -parse"]);

        let config = resolve_config(&args.corpus, Some(&args)).unwrap();
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.jobs, 2);
        assert_eq!(config.frontends["fe"].command, vec!["new", "-parse"]);
        assert_eq!(config.frontends["fe"].crash_exit_codes, vec![134]);
    }

    #[test]
    fn test_resolve_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().to_string_lossy().into_owned();
        let missing = dir.path().join("missing.toml").to_string_lossy().into_owned();
        let args = run_args(&["run", &corpus, "--config", &missing]);

        let err = resolve_config(&args.corpus, Some(&args)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }

    #[test]
    fn test_resolve_config_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().to_string_lossy().into_owned();
        let args = run_args(&["run", &corpus, "--timeout", "0"]);
        assert!(resolve_config(&args.corpus, Some(&args)).is_err());
    }

    #[test]
    fn test_list_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.swift"), "// RUN: not %fe %s\n").unwrap();
        std::fs::write(dir.path().join("b.swift"), "// RUN: %fe %s\n// FLAKY: module cache\n").unwrap();
        std::fs::write(dir.path().join("c.swift"), "struct S {}\n").unwrap();
        std::fs::write(dir.path().join("d.swift"), "// RUN: not %swift-ide-test %s\n").unwrap();

        let mut config = HarnessConfig::default();
        config.set_frontend_command("fe", vec!["swift-frontend".to_string()]);

        let lines = list_fixtures(dir.path(), &config).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("clean_diagnosed_error"));
        assert!(lines[0].ends_with("a.swift"));
        assert!(lines[1].ends_with("b.swift (flaky)"));
        assert!(lines[2].starts_with("error c.swift:"));
        assert!(lines[3].starts_with("error d.swift:"));
        assert!(lines[3].contains("%swift-ide-test"));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(0), 0);
        assert_eq!(exit_code(1), 1);
        assert_eq!(exit_code(2), 2);
        assert_eq!(exit_code(-1), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cmd_run_writes_report_and_exits_on_regression() {
        let tools = tempfile::tempdir().unwrap();
        let script = tools.path().join("fe.sh");
        std::fs::write(
            &script,
            "if grep -q CRASH \"$1\"; then kill -SEGV $$; fi\necho \"$1:1:1: error: bad\" >&2\nexit 1\n",
        )
        .unwrap();

        let corpus = tempfile::tempdir().unwrap();
        std::fs::write(corpus.path().join("ok.swift"), "// RUN: not %fe %s\n").unwrap();
        std::fs::write(corpus.path().join("crash.swift"), "// RUN: not %fe %s\n// CRASH\n").unwrap();

        let report_path = tools.path().join("report.json");
        let corpus_arg = corpus.path().to_string_lossy().into_owned();
        let frontend = format!("fe=/bin/sh {}", script.display());
        let report_arg = report_path.to_string_lossy().into_owned();
        let args = run_args(&[
            "run",
            &corpus_arg,
            "--jobs",
            "1",
            "--frontend",
            &frontend,
            "--report-json",
            &report_arg,
        ]);

        let code = cmd_run(&args).await.unwrap();
        assert_eq!(code, 1);

        let raw = std::fs::read_to_string(&report_path).unwrap();
        let report: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(report["summary"]["total"], 2);
        assert_eq!(report["regressions"][0]["fixture_id"], "crash.swift");
        assert_eq!(report["regressions"][0]["severity"], "critical");
    }

    #[tokio::test]
    async fn test_cmd_run_missing_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("nope").to_string_lossy().into_owned();
        let args = run_args(&["run", &corpus]);
        assert!(cmd_run(&args).await.is_err());
    }
}
