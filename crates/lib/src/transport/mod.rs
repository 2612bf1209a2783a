//! Command transport: run one script on a target and capture its output.
//!
//! Local targets spawn the OS shell directly. Remote targets spawn the
//! OpenSSH client in batch mode. Nothing here retries; a failure is returned
//! to the caller as-is.

mod local;
mod ssh;

use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info};

use crate::consts::SSH_BINARY_ENV;
use crate::platform::os::Os;
use crate::runner::Target;

pub use local::local_command;
pub use ssh::{ssh_args, ssh_command};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed {
    cmd: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  #[error("private key passphrases are not supported for {host}; load the key into ssh-agent")]
  PassphraseUnsupported { host: String },

  #[error("command {0} reads a sudo password from stdin but the target has none")]
  MissingSudoPassword(String),
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
  /// The ssh client binary.
  pub ssh_binary: String,
  /// Passed as `ConnectTimeout`.
  pub connect_timeout_secs: u32,
  /// Overrides the local shell (`bash` on POSIX, `powershell.exe` on Windows).
  pub local_shell: Option<String>,
}

impl Default for TransportConfig {
  fn default() -> Self {
    Self {
      ssh_binary: std::env::var(SSH_BINARY_ENV).unwrap_or_else(|_| "ssh".to_string()),
      connect_timeout_secs: 10,
      local_shell: None,
    }
  }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
}

/// Run `script` on `target`, streaming `stdin` to it.
pub async fn run(
  target: &Target,
  os: Os,
  script: &str,
  stdin: Option<&str>,
  config: &TransportConfig,
) -> Result<CommandOutput, TransportError> {
  let command = match target {
    Target::Local => local_command(os, script, config),
    Target::Remote(conn) => ssh_command(conn, script, config)?,
  };
  run_command(command, script, stdin).await
}

async fn run_command(mut command: Command, script: &str, stdin: Option<&str>) -> Result<CommandOutput, TransportError> {
  info!(cmd = %script, "running command");

  let program = command.as_std().get_program().to_string_lossy().to_string();
  command
    .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let mut child = command.spawn().map_err(|source| TransportError::Spawn {
    program: program.clone(),
    source,
  })?;

  // Feed stdin while output is collected, so neither side can fill a pipe and stall.
  let pipe = child.stdin.take();
  let (fed, output) = tokio::join!(feed_stdin(pipe, stdin), child.wait_with_output());
  let output = output?;
  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !output.status.success() {
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(TransportError::CommandFailed {
      cmd: script.to_string(),
      code: output.status.code(),
      stdout,
      stderr,
    });
  }

  fed?;

  if !stdout.is_empty() {
    debug!(program = %program, stdout = %stdout, "command output");
  }

  Ok(CommandOutput { stdout, stderr })
}

/// Write `input` to the child and close its stdin.
///
/// A child that exits without reading everything closes the pipe early; that
/// is not an error here, its exit status says what happened.
async fn feed_stdin(pipe: Option<ChildStdin>, input: Option<&str>) -> io::Result<()> {
  let (Some(mut pipe), Some(input)) = (pipe, input) else {
    return Ok(());
  };
  let written = match pipe.write_all(input.as_bytes()).await {
    Ok(()) => pipe.shutdown().await,
    Err(e) => Err(e),
  };
  match written {
    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
      debug!("child closed stdin early");
      Ok(())
    }
    other => other,
  }
}
