//! Child-process invoker for the admin CLI.

use async_trait::async_trait;
use tokio::process::Command;

/// Outcome of one admin-CLI invocation.
///
/// `cmd` is the space-joined argv, kept for journalling and diagnostics.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub cmd: String,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the driver and the operating system.
///
/// Production code uses [`SystemRunner`]; tests substitute scripted
/// runners to drive discovery and repair without a live cluster.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `argv`, capturing both streams and the exit status.
    ///
    /// Never errors: a child that cannot be spawned is reported as
    /// `success = false` with a synthetic stderr.
    async fn run(&self, argv: &[String]) -> CommandOutput;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String]) -> CommandOutput {
        let cmd = argv.join(" ");
        tracing::debug!(cmd = %cmd, "running command");

        let (program, args) = match argv.split_first() {
            Some(split) => split,
            None => {
                return CommandOutput {
                    success: false,
                    cmd,
                    stdout: String::new(),
                    stderr: "empty command line".to_string(),
                };
            }
        };

        match Command::new(program).args(args).output().await {
            Ok(output) => CommandOutput {
                success: output.status.success(),
                cmd,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(err) => CommandOutput {
                success: false,
                cmd,
                stdout: String::new(),
                stderr: format!("failed to spawn {}: {}", program, err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_command_captures_stdout() {
        let out = SystemRunner.run(&argv(&["echo", "hello"])).await;
        assert!(out.success);
        assert_eq!(out.cmd, "echo hello");
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let out = SystemRunner.run(&argv(&["false"])).await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn test_spawn_failure_yields_synthetic_stderr() {
        let out = SystemRunner
            .run(&argv(&["/nonexistent/definitely-not-a-binary"]))
            .await;
        assert!(!out.success);
        assert!(out.stderr.contains("failed to spawn"));
    }
}
