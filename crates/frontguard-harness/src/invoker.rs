//! Front-end invocation in an isolated child process.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use frontguard_domain::{duration_millis, expand, ExecutionResult, Fixture, Substitutions};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for pipes to close after the process is gone.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs a fixture through a front-end and reports what happened.
///
/// Implementations must never block the caller beyond `budget` (plus reaping)
/// and must report abnormal termination distinctly from a non-zero exit.
#[async_trait]
pub trait FrontendInvoker: Send + Sync {
    /// Execute one fixture.
    async fn invoke(
        &self,
        fixture: &Fixture,
        budget: Duration,
        cancel: watch::Receiver<bool>,
    ) -> Result<ExecutionResult>;

    /// Invoker name for logs.
    fn name(&self) -> &str;
}

/// Runs each fixture in a fresh child process inside its own process group
/// and temporary workspace.
pub struct ProcessInvoker {
    frontends: BTreeMap<String, Vec<String>>,
    env: BTreeMap<String, BTreeMap<String, String>>,
}

impl ProcessInvoker {
    /// Create an invoker for the configured front-ends.
    pub fn new(config: &HarnessConfig) -> Self {
        let env = config
            .frontends
            .iter()
            .filter(|(_, frontend)| !frontend.env.is_empty())
            .map(|(name, frontend)| (name.clone(), frontend.env.clone()))
            .collect();
        Self {
            frontends: config.frontend_commands(),
            env,
        }
    }

    /// Expand the RUN line and build the child command.
    fn build_command(
        &self,
        fixture: &Fixture,
        workspace: &Path,
        source_path: &Path,
    ) -> Result<(String, Command)> {
        let source = source_path.to_string_lossy();
        let temp = workspace.to_string_lossy();
        let subs = Substitutions {
            source_path: &source,
            temp_dir: &temp,
            frontends: &self.frontends,
        };
        let argv = expand(&fixture.directives.run.command, &subs).map_err(|source| {
            HarnessError::Fixture {
                fixture: fixture.id.clone(),
                source,
            }
        })?;
        let (program, args) = argv.split_first().ok_or_else(|| {
            HarnessError::Config(format!("fixture {} expands to an empty command", fixture.id))
        })?;

        let mut std_cmd = std::process::Command::new(program);
        std_cmd
            .args(args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // New process group led by the child, so deadline kills reach grandchildren.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        for name in fixture.directives.run.frontend_refs() {
            if let Some(env) = self.env.get(name) {
                std_cmd.envs(env);
            }
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);
        Ok((program.clone(), cmd))
    }
}

enum Exit {
    Finished(std::io::Result<ExitStatus>),
    Deadline,
    Cancelled,
}

#[async_trait]
impl FrontendInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        fixture: &Fixture,
        budget: Duration,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ExecutionResult> {
        // Removed when dropped, on every return path.
        let workspace = tempfile::Builder::new()
            .prefix("frontguard-")
            .tempdir()
            .map_err(HarnessError::Workspace)?;

        let source_path = workspace.path().join(fixture.file_name());
        tokio::fs::write(&source_path, &fixture.bytes)
            .await
            .map_err(|source| HarnessError::Io {
                path: source_path.clone(),
                source,
            })?;

        let (program, mut cmd) = self.build_command(fixture, workspace.path(), &source_path)?;

        debug!(
            fixture = %fixture.id,
            program = %program,
            budget_ms = duration_millis(budget),
            "Spawning front-end"
        );

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            _ = tokio::time::sleep(budget) => Exit::Deadline,
            _ = wait_cancelled(&mut cancel) => Exit::Cancelled,
        };

        let (timed_out, cancelled) = match &exit {
            Exit::Finished(_) => (false, false),
            Exit::Deadline => (true, false),
            Exit::Cancelled => (false, true),
        };

        let status = match exit {
            Exit::Finished(status) => {
                // Sweep anything the front-end left behind in its group.
                kill_group(pid);
                status.map_err(HarnessError::Wait)?
            }
            Exit::Deadline | Exit::Cancelled => {
                warn!(
                    fixture = %fixture.id,
                    budget_ms = duration_millis(budget),
                    cancelled,
                    "Terminating front-end process group"
                );
                kill_group(pid);
                let _ = child.start_kill();
                child.wait().await.map_err(HarnessError::Wait)?
            }
        };

        let duration_ms = duration_millis(start.elapsed());
        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        let (exit_code, signal, core_dumped) = decode_status(&status);

        debug!(
            fixture = %fixture.id,
            exit_code = ?exit_code,
            signal = ?signal,
            duration_ms,
            "Front-end finished"
        );

        Ok(ExecutionResult {
            exit_code,
            signal,
            core_dumped,
            stdout,
            stderr,
            duration_ms,
            timed_out,
            cancelled,
        })
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// Resolve once the cancellation flag is set. Never resolves if the sender is gone.
pub async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn collect(mut handle: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg takes plain integers and has no memory preconditions.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn decode_status(status: &ExitStatus) -> (Option<i32>, Option<i32>, bool) {
    use std::os::unix::process::ExitStatusExt;
    (status.code(), status.signal(), status.core_dumped())
}

#[cfg(not(unix))]
fn decode_status(status: &ExitStatus) -> (Option<i32>, Option<i32>, bool) {
    (status.code(), None, false)
}
