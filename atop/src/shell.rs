//! Shell executors
//!
//! Everything atop learns about the device comes from the standard output of
//! a shell command. [`ShellExecutor`] is that seam:
//!
//! - [`AdbShell`] runs the command on the device through `adb shell`
//! - [`HostShell`] runs it on the host through `sh -c`
//! - [`ReplayShell`] answers from canned output (simulation mode and tests)

use log::debug;
use std::collections::VecDeque;
use std::process::Command;
use std::sync::Mutex;

use crate::domain::ExecutionError;

/// Captured standard output, one entry per line.
pub type ShellOutput = Vec<String>;

/// Runs a command and captures its standard output.
pub trait ShellExecutor: Send + Sync {
    /// Run `command` and return its output split into lines.
    ///
    /// An empty vector is a valid result (e.g. no matching files).
    ///
    /// # Errors
    /// `ExecutionError::SpawnFailed` when the process cannot be started.
    fn execute(&self, command: &str) -> Result<ShellOutput, ExecutionError>;
}

/// Turn raw stdout into trimmed lines. Empty output gives no lines.
fn split_output(stdout: &[u8]) -> ShellOutput {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(|line| line.trim_end_matches('\r').to_string()).collect()
}

fn run(mut cmd: Command, display: &str) -> Result<ShellOutput, ExecutionError> {
    let output = cmd.output().map_err(|source| ExecutionError::SpawnFailed {
        command: display.to_string(),
        source,
    })?;

    if !output.status.success() {
        debug!("`{display}` exited with {}", output.status);
    }

    Ok(split_output(&output.stdout))
}

// =============================================================================
// ADB
// =============================================================================

/// Runs commands on the connected device via `adb shell`.
#[derive(Debug, Clone, Default)]
pub struct AdbShell {
    /// Device serial passed as `adb -s <serial>`; `None` uses the only device.
    serial: Option<String>,
}

impl AdbShell {
    #[must_use]
    pub fn new(serial: Option<String>) -> Self {
        Self { serial }
    }
}

impl ShellExecutor for AdbShell {
    fn execute(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        let mut cmd = Command::new("adb");
        if let Some(ref serial) = self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.arg("shell").arg(command);
        run(cmd, &format!("adb shell {command}"))
    }
}

// =============================================================================
// HOST
// =============================================================================

/// Runs commands on the host (preflight checks, `adb devices`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct HostShell;

impl ShellExecutor for HostShell {
    fn execute(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run(cmd, command)
    }
}

// =============================================================================
// REPLAY
// =============================================================================

enum Response {
    Output(ShellOutput),
    SpawnFailure,
}

struct Rule {
    prefix: String,
    responses: VecDeque<Response>,
}

/// Answers commands from canned output, matched by command prefix.
///
/// Each matching call consumes the next queued response; the last one keeps
/// being replayed once the queue is down to it. Commands without a rule
/// produce empty output. Every command is recorded for inspection.
#[derive(Default)]
pub struct ReplayShell {
    rules: Mutex<Vec<Rule>>,
    history: Mutex<Vec<String>>,
}

impl ReplayShell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` as the next answer to commands starting with `prefix`.
    #[must_use]
    pub fn respond<I, S>(self, prefix: &str, output: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = output.into_iter().map(Into::into).collect();
        self.push_response(prefix, Response::Output(lines));
        self
    }

    /// Queue a spawn failure as the next answer to commands starting with `prefix`.
    #[must_use]
    pub fn fail(self, prefix: &str) -> Self {
        self.push_response(prefix, Response::SpawnFailure);
        self
    }

    /// Queue more output after construction (e.g. between polls in a test).
    pub fn push_output<I, S>(&self, prefix: &str, output: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = output.into_iter().map(Into::into).collect();
        self.push_response(prefix, Response::Output(lines));
    }

    /// Commands issued so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    fn push_response(&self, prefix: &str, response: Response) {
        let Ok(mut rules) = self.rules.lock() else {
            return;
        };
        if let Some(rule) = rules.iter_mut().find(|r| r.prefix == prefix) {
            rule.responses.push_back(response);
        } else {
            rules.push(Rule {
                prefix: prefix.to_string(),
                responses: VecDeque::from([response]),
            });
        }
    }
}

impl ShellExecutor for ReplayShell {
    fn execute(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        if let Ok(mut history) = self.history.lock() {
            history.push(command.to_string());
        }

        let Ok(mut rules) = self.rules.lock() else {
            return Ok(Vec::new());
        };
        // Longest prefix wins so `ls /data/local/tmp/benchmark_model` can be
        // answered separately from `ls`.
        let Some(rule) = rules
            .iter_mut()
            .filter(|r| command.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
        else {
            return Ok(Vec::new());
        };

        let response = if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            None
        };
        let response = response.as_ref().or_else(|| rule.responses.front());

        match response {
            Some(Response::Output(lines)) => Ok(lines.clone()),
            Some(Response::SpawnFailure) => Err(ExecutionError::SpawnFailed {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "replayed spawn failure"),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_output() {
        assert!(split_output(b"  \n").is_empty());
        assert_eq!(split_output(b"a\r\nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_host_shell_echo() {
        let out = HostShell.execute("printf 'one\\ntwo\\n'").unwrap();
        assert_eq!(out, vec!["one", "two"]);
    }

    #[test]
    fn test_host_shell_empty_output_is_ok() {
        let out = HostShell.execute("true").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_replay_sequence_repeats_last() {
        let shell = ReplayShell::new().respond("dmesg", ["a"]).respond("dmesg", ["a", "b"]);
        assert_eq!(shell.execute("dmesg").unwrap(), vec!["a"]);
        assert_eq!(shell.execute("dmesg").unwrap(), vec!["a", "b"]);
        assert_eq!(shell.execute("dmesg").unwrap(), vec!["a", "b"]);
        assert!(shell.execute("whoami").unwrap().is_empty());
        assert_eq!(shell.commands().len(), 4);
    }

    #[test]
    fn test_replay_longest_prefix_and_failure() {
        let shell = ReplayShell::new().respond("ls", ["x"]).fail("ls /missing");
        assert_eq!(shell.execute("ls /tmp").unwrap(), vec!["x"]);
        assert!(matches!(
            shell.execute("ls /missing"),
            Err(ExecutionError::SpawnFailed { .. })
        ));
    }
}
