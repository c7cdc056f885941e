//! Captured result of one front-end invocation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What an isolated front-end process did.
///
/// Owned by the invoker for the duration of one run, then handed by value to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Terminating signal, if any.
    pub signal: Option<i32>,

    /// Whether the terminating signal produced a core dump.
    pub core_dumped: bool,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// The harness killed the process group at the deadline.
    pub timed_out: bool,

    /// The harness killed the process group because the pass was cancelled.
    pub cancelled: bool,
}

impl ExecutionResult {
    /// Exit code 0 and no terminating signal.
    pub fn exited_zero(&self) -> bool {
        self.signal.is_none() && self.exit_code == Some(0)
    }

    /// Normal exit with a non-zero code.
    pub fn exited_nonzero(&self) -> bool {
        self.signal.is_none() && matches!(self.exit_code, Some(code) if code != 0)
    }

    /// stderr followed by stdout, the text diagnostics are searched in.
    pub fn diagnostics(&self) -> String {
        let mut text = String::with_capacity(self.stderr.len() + self.stdout.len() + 1);
        text.push_str(&self.stderr);
        if !self.stderr.is_empty() && !self.stdout.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.stdout);
        text
    }
}
