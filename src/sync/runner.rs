use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::sync::SyncError;

#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    /// Last non-blank stdout line; scripts report their result there.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last()
    }
}

/// Runs a script against the external service. Swapped for a canned runner in tests.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &str, timeout: Duration) -> Result<ScriptOutput, SyncError>;
}

/// Runs scripts through a PowerShell-compatible shell.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl ScriptRunner for ShellRunner {
    async fn run(&self, script: &str, timeout: Duration) -> Result<ScriptOutput, SyncError> {
        debug!(
            shell = %self.shell,
            timeout_secs = timeout.as_secs(),
            "Running sync script"
        );

        let child = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-Command"])
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SyncError::Spawn(e.to_string()))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| SyncError::Spawn(e.to_string()))?,
            Err(_) => {
                // dropping the future kills the child
                warn!(timeout_secs = timeout.as_secs(), "Sync script timed out, killing process");
                return Err(SyncError::Timeout(timeout.as_secs()));
            }
        };

        let result = ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.stderr.trim().is_empty() {
            warn!(stderr = %result.stderr.trim(), "Sync script wrote to stderr");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_line_skips_trailing_blanks() {
        let out = ScriptOutput {
            stdout: "warming up\n{\"success\":true}\n\n  \n".into(),
            stderr: String::new(),
        };
        assert_eq!(out.last_line(), Some("{\"success\":true}"));
        assert_eq!(ScriptOutput::default().last_line(), None);
    }

    #[actix_web::test]
    async fn missing_shell_is_a_spawn_error() {
        let runner = ShellRunner::new("centrapro-no-such-shell");
        let result = runner.run("Write-Output 1", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SyncError::Spawn(_))));
    }
}
