/*
 * hooks.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Lint-fix hook run on the intermediate markdown.
 */

use std::path::Path;

use thiserror::Error;
use vault_export_runtime::{ProcessRunner, RunOptions, RuntimeError};

/// Errors from a lint-fix hook. Never fatal to a conversion.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("{command} exited with code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Fixes up a markdown file in place before it is compiled.
pub trait LintFixer: Send + Sync {
    fn fix(&self, path: &Path) -> Result<(), LintError>;
}

/// Runs an external command with the file path as its last argument.
pub struct CommandLintFixer<'r> {
    runner: &'r dyn ProcessRunner,
    command: String,
    args: Vec<String>,
}

impl<'r> CommandLintFixer<'r> {
    pub fn new(runner: &'r dyn ProcessRunner, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            runner,
            command: command.into(),
            args,
        }
    }

    /// Split a configured command line such as
    /// `markdownlint --fix --config "my rules.json"`. Returns `None` for a
    /// blank line.
    pub fn from_command_line(runner: &'r dyn ProcessRunner, line: &str) -> Option<Self> {
        let mut parts = split_command_line(line).into_iter();
        let command = parts.next()?;
        Some(Self::new(runner, command, parts.collect()))
    }
}

/// Whitespace-separated words. Single or double quotes group a word, and a
/// backslash outside single quotes escapes the next character.
fn split_command_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => word.push(c),
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    word.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => word.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(word);
    }
    words
}

impl LintFixer for CommandLintFixer<'_> {
    fn fix(&self, path: &Path) -> Result<(), LintError> {
        let mut args = self.args.clone();
        args.push(path.to_string_lossy().into_owned());

        let options = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => RunOptions::default().with_cwd(dir),
            _ => RunOptions::default(),
        };
        tracing::debug!(command = %self.command, "Running lint fix");
        let output = self.runner.run(&self.command, &args, &options)?;
        if output.success() {
            Ok(())
        } else {
            Err(LintError::Failed {
                command: self.command.clone(),
                code: output.code,
                stderr: output.stderr_string().trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use vault_export_runtime::{CommandOutput, RuntimeResult};

    struct Recorder {
        code: i32,
        calls: Mutex<Vec<(String, Vec<String>, Option<PathBuf>)>>,
    }

    impl ProcessRunner for Recorder {
        fn run(&self, command: &str, args: &[String], options: &RunOptions) -> RuntimeResult<CommandOutput> {
            self.calls.lock().unwrap().push((
                command.to_string(),
                args.to_vec(),
                options.cwd.clone(),
            ));
            Ok(CommandOutput {
                code: self.code,
                stdout: Vec::new(),
                stderr: b"MD012 too many blanks\n".to_vec(),
            })
        }
    }

    #[test]
    fn test_fixer_appends_path() {
        let runner = Recorder {
            code: 0,
            calls: Mutex::new(Vec::new()),
        };
        let fixer = CommandLintFixer::from_command_line(&runner, "markdownlint --fix").unwrap();
        fixer.fix(Path::new("/tmp/run/doc.md")).unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, "markdownlint");
        assert_eq!(calls[0].1, vec!["--fix", "/tmp/run/doc.md"]);
        assert_eq!(calls[0].2.as_deref(), Some(Path::new("/tmp/run")));
    }

    #[test]
    fn test_fixer_reports_failure() {
        let runner = Recorder {
            code: 1,
            calls: Mutex::new(Vec::new()),
        };
        let fixer = CommandLintFixer::new(&runner, "lint", Vec::new());
        let err = fixer.fix(Path::new("doc.md")).unwrap_err();
        assert!(matches!(err, LintError::Failed { code: 1, .. }));
        assert!(err.to_string().contains("MD012"));
    }

    #[test]
    fn test_quoted_arguments_stay_together() {
        let runner = Recorder {
            code: 0,
            calls: Mutex::new(Vec::new()),
        };
        let line = r#"markdownlint --config "my rules.json" --ignore 'a b' c\ d"#;
        let fixer = CommandLintFixer::from_command_line(&runner, line).unwrap();
        fixer.fix(Path::new("doc.md")).unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, "markdownlint");
        assert_eq!(
            calls[0].1,
            vec!["--config", "my rules.json", "--ignore", "a b", "c d", "doc.md"]
        );
    }

    #[test]
    fn test_split_command_line() {
        assert_eq!(split_command_line("  a   b\t"), vec!["a", "b"]);
        assert_eq!(split_command_line(r#"x "" y"#), vec!["x", "", "y"]);
        assert_eq!(split_command_line(r#"'it"s' "say \"hi\"""#), vec!["it\"s", "say \"hi\""]);
        assert!(split_command_line("").is_empty());
    }

    #[test]
    fn test_blank_command_line() {
        let runner = Recorder {
            code: 0,
            calls: Mutex::new(Vec::new()),
        };
        assert!(CommandLintFixer::from_command_line(&runner, "   ").is_none());
    }
}
