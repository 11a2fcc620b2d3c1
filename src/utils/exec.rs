//! External command execution utilities.
//!
//! Provides a Builder-based API for running preprocessors and other
//! command-line tools with stdin piping and filtered stderr logging.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::from_slice(&["lessc", "-"])
//!     .cwd(base_dir)
//!     .stdin(less_source)
//!     .run()?;
//! ```

use crate::log;
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::OnceLock,
    thread,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin_data: Option<Vec<u8>>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create from a command array (e.g., `["lessc"]` or `["npx", "lessc"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Execute the command and return output.
    ///
    /// A non-zero exit status is an error carrying the command's stderr.
    pub fn run(self) -> Result<Output> {
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        // Separate writer thread: the child may fill stdout before draining stdin
        let writer = match (self.stdin_data, child.stdin.take()) {
            (Some(data), Some(mut stdin)) => Some(thread::spawn(move || stdin.write_all(&data))),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))?;
        let written = writer.map(thread::JoinHandle::join);

        log_output(&name, &output, filter)?;

        if let Some(result) = written {
            match result.map_err(|_| anyhow!("stdin writer for `{name}` panicked"))? {
                // The child exited successfully without reading everything
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other.with_context(|| format!("Failed to write stdin to `{name}`"))?,
            }
        }
        Ok(output)
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| {
                let plain = strip_ansi(line);
                let trimmed = plain.trim();
                !trimmed.is_empty() && !self.should_skip(trimmed)
            })
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Log command stderr, returning error on failure.
fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(format_error(name, output));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());
    Ok(())
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = strip_ansi(stderr.trim()).into_owned();

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(&stderr);
    }
    msg
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const SILENT: FilterRule = FilterRule::new(&[""]);

    #[test]
    fn test_stdin_round_trip() {
        let output = Cmd::from_slice(&["cat"]).stdin("a { color: red }").run().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "a { color: red }");
    }

    #[test]
    fn test_large_output_before_reading_stdin() {
        let input = "x".repeat(1 << 20);
        let output = Cmd::from_slice(&["sh", "-c", "head -c 1048576 /dev/zero; cat > /dev/null"])
            .stdin(&input)
            .run()
            .unwrap();
        assert_eq!(output.stdout.len(), 1 << 20);
    }

    #[test]
    fn test_failure_is_error() {
        let err = Cmd::from_slice(&["sh", "-c", "echo broken >&2; exit 3"])
            .filter(&SILENT)
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh` failed"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::from_slice(&["definitely-not-a-real-program-xyz"]).run().unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
