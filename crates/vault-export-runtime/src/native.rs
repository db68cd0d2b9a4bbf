/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Native process runner backed by std::process.
 */

use std::io::{self, Write};
use std::process::{Command, Stdio};

use crate::traits::{CommandOutput, ProcessRunner, RunOptions, RuntimeError, RuntimeResult};

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(
        &self,
        command: &str,
        args: &[String],
        options: &RunOptions,
    ) -> RuntimeResult<CommandOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        tracing::debug!(command, args = ?args, "Spawning process");

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RuntimeError::NotFound(command.to_string()),
            _ => RuntimeError::launch(command, e),
        })?;

        // stdin is fed from a separate thread so a child that fills its
        // stdout pipe before draining stdin cannot deadlock us.
        let writer = match (child.stdin.take(), options.stdin.clone()) {
            (Some(mut stdin), Some(bytes)) => Some(std::thread::spawn(move || {
                stdin.write_all(&bytes)
                // stdin is dropped here, closing the pipe
            })),
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit without reading all of stdin.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(RuntimeError::Io(e)),
                Err(_) => return Err(io::Error::other("stdin writer panicked").into()),
            }
        }

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_collects_stdout_and_exit_code() {
        let runner = NativeRunner::new();
        let output = runner
            .run(
                "sh",
                &["-c".to_string(), "echo hello; exit 3".to_string()],
                &RunOptions::default(),
            )
            .unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout_string().trim(), "hello");
    }

    #[test]
    fn test_streams_stdin() {
        let runner = NativeRunner::new();
        let output = runner
            .run("cat", &[], &RunOptions::default().with_stdin("streamed"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_string(), "streamed");
    }

    #[test]
    fn test_respects_cwd_and_env() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = NativeRunner::new();
        let options = RunOptions::default()
            .with_cwd(temp.path())
            .with_env("VAULT_EXPORT_TEST", "42");
        let output = runner
            .run(
                "sh",
                &["-c".to_string(), "pwd -P; echo $VAULT_EXPORT_TEST".to_string()],
                &options,
            )
            .unwrap();
        let stdout = output.stdout_string();
        let canonical = temp.path().canonicalize().unwrap();
        assert!(stdout.contains(canonical.to_str().unwrap()));
        assert!(stdout.contains("42"));
    }

    #[test]
    fn test_missing_binary_is_not_found() {
        let runner = NativeRunner::new();
        let err = runner
            .run("no-such-binary-xyz", &[], &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(ref c) if c == "no-such-binary-xyz"));
    }
}
