//! Local execution.

use tokio::process::Command;

use super::TransportConfig;
use crate::platform::os::Os;

/// Build the process that runs `script` with the local shell for `os`.
///
/// Unlike remote execution the environment is inherited, so `$HOME`, `$USER`
/// and `PATH` mean the same thing they would in a login session.
pub fn local_command(os: Os, script: &str, config: &TransportConfig) -> Command {
  let (shell, args) = get_shell(os, config.local_shell.as_deref());
  let mut command = Command::new(shell);
  command.args(args).arg(script);
  command
}

/// The shell binary and the arguments that precede the script.
fn get_shell(os: Os, override_shell: Option<&str>) -> (String, Vec<&'static str>) {
  let powershell_args = vec!["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-Command"];

  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      powershell_args
    } else {
      vec!["-c"]
    };
    return (shell.to_string(), args);
  }

  let shell = os.default_shell().to_string();
  if os.is_posix() { (shell, vec!["-c"]) } else { (shell, powershell_args) }
}
