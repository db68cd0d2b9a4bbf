/*
 * vault-export-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * External process abstraction for vault-export.
 *
 * The conversion pipeline never spawns processes directly. It hands a
 * command name and an ordered argument list to a `ProcessRunner`, which
 * allows tests to substitute a scripted runner and hosts to substitute a
 * sandboxed one.
 */

mod native;
mod traits;

// Re-export core types (API surface)
pub use traits::{CommandOutput, ProcessRunner, RunOptions, RuntimeError, RuntimeResult};

// Re-export runner implementations
pub use native::NativeRunner;

/// Create a runner for the current platform.
pub fn default_runner() -> NativeRunner {
    NativeRunner::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runner_reports_missing_binary() {
        let runner = default_runner();
        let err = runner
            .run(
                "vault-export-definitely-not-a-binary",
                &[],
                &RunOptions::default(),
            )
            .unwrap_err();
        assert!(err.is_launch_failure());
    }
}
