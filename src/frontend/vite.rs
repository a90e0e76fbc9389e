//! Vite subprocesses.
//!
//! # Responsibilities
//! - Run the production build once and report its output
//! - Keep the development server running until shutdown
//!
//! # Design Decisions
//! - Failures are logged and never stop the HTTP side
//! - Both commands run in app home with the user's `npx`

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tokio::sync::broadcast;

/// A program plus arguments, run in a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: &[&str], cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// `npx vite build`
    pub fn vite_build(app_home: &Path) -> Self {
        Self::new("npx", &["vite", "build"], app_home)
    }

    /// `npx vite --port <port>`
    pub fn vite_dev(app_home: &Path, port: u16) -> Self {
        let port = port.to_string();
        Self::new("npx", &["vite", "--port", &port], app_home)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.cwd);
        command
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a build run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    Failed { code: Option<i32> },
    NotStarted { reason: String },
}

fn build_command(tool: &ToolCommand) -> Command {
    let mut command = tool.command();
    command.stdin(Stdio::null()).kill_on_drop(true);
    command
}

/// Run a build to completion, logging its output. Dropping the future kills
/// the build.
pub async fn run_build(tool: &ToolCommand) -> BuildOutcome {
    tracing::info!(command = %tool.display(), cwd = ?tool.cwd, "Running frontend build");

    let output = match build_command(tool).output().await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(command = %tool.display(), error = %e, "exec error");
            return BuildOutcome::NotStarted { reason: e.to_string() };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        tracing::info!(stdout = %stdout.trim_end(), "Frontend build output");
    }
    if !stderr.trim().is_empty() {
        tracing::warn!(stderr = %stderr.trim_end(), "Frontend build diagnostics");
    }

    if output.status.success() {
        tracing::info!("Frontend build finished");
        BuildOutcome::Succeeded
    } else {
        tracing::error!(status = %output.status, "Frontend build failed");
        BuildOutcome::Failed { code: output.status.code() }
    }
}

/// A running development server.
pub struct DevServer {
    child: Child,
    tool: ToolCommand,
}

impl DevServer {
    /// Spawn with inherited stdio. The child dies with this handle.
    pub fn spawn(tool: ToolCommand) -> std::io::Result<Self> {
        let child = tool
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        tracing::info!(
            command = %tool.display(),
            pid = ?child.id(),
            "Vite development server with hot module reload started"
        );
        Ok(Self { child, tool })
    }

    /// Wait for the server to exit or for shutdown, whichever comes first.
    /// Returns the exit status if the server stopped on its own.
    pub async fn supervise(mut self, mut shutdown: broadcast::Receiver<()>) -> Option<ExitStatus> {
        tokio::select! {
            status = self.child.wait() => match status {
                Ok(status) if status.success() => {
                    tracing::info!(command = %self.tool.display(), "Vite server exited");
                    Some(status)
                }
                Ok(status) => {
                    tracing::error!(command = %self.tool.display(), status = %status, "Vite server exited with error");
                    Some(status)
                }
                Err(e) => {
                    tracing::error!(command = %self.tool.display(), error = %e, "Failed to wait for Vite server");
                    None
                }
            },
            _ = shutdown.recv() => {
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(error = %e, "Failed to stop Vite server");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_vite_commands() {
        let home = Path::new("/srv/app");
        let build = ToolCommand::vite_build(home);
        assert_eq!(build.display(), "npx vite build");
        assert_eq!(build.cwd, home);

        let dev = ToolCommand::vite_dev(home, 3001);
        assert_eq!(dev.display(), "npx vite --port 3001");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_fatal() {
        let tool = ToolCommand::new("flight-no-such-program", &[], Path::new("."));
        assert!(matches!(run_build(&tool).await, BuildOutcome::NotStarted { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_exit_codes() {
        let ok = ToolCommand::new("sh", &["-c", "echo built"], Path::new("."));
        assert_eq!(run_build(&ok).await, BuildOutcome::Succeeded);

        let failing = ToolCommand::new("sh", &["-c", "echo oops >&2; exit 3"], Path::new("."));
        assert_eq!(run_build(&failing).await, BuildOutcome::Failed { code: Some(3) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_aborted_build_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let script = format!("sleep 1; touch {}", marker.display());
        let tool = ToolCommand::new("sh", &["-c", &script], dir.path());

        let task = tokio::spawn(async move { run_build(&tool).await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        task.abort();
        let _ = task.await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dev_server_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let server = DevServer::spawn(ToolCommand::new("sleep", &["30"], Path::new("."))).unwrap();
        let handle = tokio::spawn(server.supervise(rx));

        tx.send(()).unwrap();
        let exited = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(exited.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dev_server_reports_own_exit() {
        let (_tx, rx) = broadcast::channel(1);
        let server = DevServer::spawn(ToolCommand::new("sh", &["-c", "exit 2"], Path::new("."))).unwrap();
        let status = server.supervise(rx).await.unwrap();
        assert_eq!(status.code(), Some(2));
    }
}
