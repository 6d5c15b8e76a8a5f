//! Command-style hypervisor control surface.
//!
//! The driver manages guests through a `tart`-compatible command-line
//! hypervisor: `pull`, `clone`, `set`, `run`, `ip`, `list`, `delete`. The
//! hypervisor itself is an external collaborator; only its invocation
//! surface is modeled here, behind a trait so tests can script it.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::{Child, Command};

use crate::IsolateError;

/// Captured output of a finished hypervisor command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The hypervisor's command surface.
///
/// [`Hypervisor::output`] runs a short-lived subcommand to completion;
/// [`Hypervisor::spawn`] starts a long-running one (guest boot) and hands
/// the child process back to the caller.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Run a subcommand to completion and capture its output.
    ///
    /// # Errors
    /// Returns [`IsolateError::Hypervisor`] on a non-zero exit status and
    /// [`IsolateError::Io`] if the binary cannot be executed.
    async fn output(&self, args: &[&str]) -> Result<CommandOutput, IsolateError>;

    /// Spawn a long-running subcommand with stderr piped.
    ///
    /// # Errors
    /// Returns [`IsolateError::Io`] if the binary cannot be executed.
    fn spawn(&self, args: &[&str]) -> Result<Child, IsolateError>;
}

/// Drives the `tart` command-line hypervisor.
#[derive(Debug, Clone)]
pub struct TartCli {
    binary_path: PathBuf,
}

impl TartCli {
    /// Create a driver for the hypervisor binary at the given path.
    #[must_use]
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Create a driver that looks for `tart` in `$PATH`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PathBuf::from("tart"))
    }
}

#[async_trait]
impl Hypervisor for TartCli {
    async fn output(&self, args: &[&str]) -> Result<CommandOutput, IsolateError> {
        let output = Command::new(&self.binary_path).args(args).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(IsolateError::Hypervisor {
                command: args.join(" "),
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_owned(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    fn spawn(&self, args: &[&str]) -> Result<Child, IsolateError> {
        let child = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }
}

/// One instance as reported by `list --format json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListedInstance {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Parse the JSON array printed by `list --format json`.
///
/// # Errors
/// Returns [`IsolateError::UnparsableOutput`] if the payload is not the
/// expected JSON shape.
pub fn parse_instance_list(raw: &str) -> Result<Vec<ListedInstance>, IsolateError> {
    serde_json::from_str(raw).map_err(|e| IsolateError::UnparsableOutput {
        command: "list --format json".to_owned(),
        reason: e.to_string(),
    })
}
