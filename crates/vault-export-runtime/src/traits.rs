/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the ProcessRunner trait and supporting types.
 */

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while running an external command.
///
/// A non-zero exit status is *not* an error at this layer: it is reported
/// through [`CommandOutput::code`] so callers can inspect stderr. Only
/// failures to start or communicate with the process end up here.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The binary could not be found (not on PATH, bad configured path)
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The process could not be started (permissions, bad executable format)
    #[error("Failed to launch '{command}': {source}")]
    Launch {
        /// The command that failed to start
        command: String,
        #[source]
        source: io::Error,
    },

    /// I/O failure while feeding stdin or collecting output
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Create a launch error for a command.
    pub fn launch(command: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            command: command.into(),
            source,
        }
    }

    /// Whether the process never started.
    ///
    /// Callers use this to suggest configuration fixes (wrong binary path)
    /// rather than document fixes.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_) | RuntimeError::Launch { .. })
    }
}

/// Output from a command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when terminated by a signal)
    pub code: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Per-invocation process settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Extra environment variables (added on top of the inherited environment)
    pub env: Vec<(String, String)>,
    /// Bytes written to the child's stdin, which is closed afterwards
    pub stdin: Option<Vec<u8>>,
}

impl RunOptions {
    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Stream bytes to the child's stdin
    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Executes external commands.
///
/// Implementations block until the process exits. stdout and stderr are
/// accumulated in full; compiler output is bounded by document size in
/// practice so no cap is applied.
pub trait ProcessRunner: Send + Sync {
    /// Run `command` with `args` and collect its output.
    ///
    /// Returns `Ok` for any process that started, whatever its exit code.
    fn run(&self, command: &str, args: &[String], options: &RunOptions)
    -> RuntimeResult<CommandOutput>;

    /// Find a binary, checking an override environment variable first.
    ///
    /// Default implementation consults `env_var` and then the system PATH.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(path) = std::env::var(env_var) {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Some(path);
            }
        }
        which::which(name).ok()
    }
}
