//! Harness and per-front-end configuration.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the corpus root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "frontguard.toml";

/// Configuration for one target front-end, referenced from RUN lines as `%name`.
///
/// The crash/diagnostic boundary differs between compilers, so every
/// front-end carries its own markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrontendConfig {
    /// Command substituted for `%name` (first element is the executable).
    pub command: Vec<String>,

    /// Regexes identifying a structured error diagnostic.
    pub diagnostic_markers: Vec<String>,

    /// Regexes whose presence in the output means the front-end crashed.
    pub crash_markers: Vec<String>,

    /// Exit codes the front-end uses after catching its own fault.
    pub crash_exit_codes: Vec<i32>,

    /// Signals that count as a crash.
    pub fault_signals: Vec<i32>,

    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            diagnostic_markers: vec!["error:".to_string()],
            crash_markers: Vec::new(),
            crash_exit_codes: Vec::new(),
            fault_signals: default_fault_signals(),
            env: BTreeMap::new(),
        }
    }
}

impl FrontendConfig {
    /// Create a front-end configuration with default markers.
    pub fn with_command(command: Vec<String>) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }
}

/// Fault signals: segmentation violation, illegal instruction, abort, bus error,
/// floating point exception, trap and bad system call.
#[cfg(unix)]
pub fn default_fault_signals() -> Vec<i32> {
    vec![
        libc::SIGSEGV,
        libc::SIGILL,
        libc::SIGABRT,
        libc::SIGBUS,
        libc::SIGFPE,
        libc::SIGTRAP,
        libc::SIGSYS,
    ]
}

#[cfg(not(unix))]
pub fn default_fault_signals() -> Vec<i32> {
    Vec::new()
}

/// Configuration for a corpus pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Time budget per fixture, in seconds.
    pub timeout_secs: u64,

    /// Concurrent fixtures (0 = available parallelism).
    pub jobs: usize,

    /// Fixture file extensions, without the dot.
    pub extensions: Vec<String>,

    /// Front-ends by substitution name.
    pub frontends: BTreeMap<String, FrontendConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            jobs: 0,
            extensions: vec!["swift".to_string()],
            frontends: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check invariants the rest of the harness relies on.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(HarnessError::Config("timeout_secs must be positive".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(HarnessError::Config("at least one fixture extension is required".to_string()));
        }
        for (name, frontend) in &self.frontends {
            if frontend.command.is_empty() {
                return Err(HarnessError::Config(format!(
                    "front-end `{}` has an empty command",
                    name
                )));
            }
            if name.is_empty() || name == "s" || name == "t" {
                return Err(HarnessError::Config(format!(
                    "`{}` is not a valid front-end name",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Default time budget per fixture.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Worker count, resolving 0 to the available parallelism.
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Substitution table handed to RUN-line expansion.
    pub fn frontend_commands(&self) -> BTreeMap<String, Vec<String>> {
        self.frontends
            .iter()
            .map(|(name, frontend)| (name.clone(), frontend.command.clone()))
            .collect()
    }

    /// Register or replace a front-end command, keeping any configured markers.
    pub fn set_frontend_command(&mut self, name: &str, command: Vec<String>) {
        self.frontends
            .entry(name.to_string())
            .or_default()
            .command = command;
    }
}
