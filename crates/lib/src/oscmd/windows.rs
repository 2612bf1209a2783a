//! PowerShell command builder.

use std::collections::BTreeMap;

use super::{ActionPair, FileWrite, OsCommand, backup_path, validate_env};
use crate::command::ResolveError;
use crate::util::shell::{ps_double_quote, ps_single_quote};

/// Builds PowerShell snippets. There is no sudo equivalent, so elevation,
/// run-as-user and password-on-stdin are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsCommand;

/// A PowerShell expression for `path` with `%VAR%` references expanded.
///
/// PowerShell only expands `$env:VAR` inside strings, but the path roots are
/// cmd.exe style.
fn expanded(path: &str) -> String {
  format!("[Environment]::ExpandEnvironmentVariables({})", ps_double_quote(path))
}

impl OsCommand for WindowsCommand {
  fn family(&self) -> &'static str {
    "windows"
  }

  fn build_command_line(
    &self,
    action: &str,
    env: &BTreeMap<String, String>,
    elevate: bool,
    require_password_from_stdin: bool,
    run_as_user: Option<&str>,
  ) -> Result<String, ResolveError> {
    let requested = if let Some(user) = run_as_user.filter(|u| !u.is_empty()) {
      Some(format!("run as user {}", user))
    } else if elevate {
      Some("elevation".to_string())
    } else if require_password_from_stdin {
      Some("password from stdin".to_string())
    } else {
      None
    };
    if let Some(requested) = requested {
      return Err(ResolveError::UnsupportedElevation {
        os: self.family(),
        requested,
      });
    }

    validate_env(env)?;

    let mut line = String::new();
    for (name, value) in env {
      line.push_str(&format!("$env:{} = {}; ", name, ps_single_quote(value)));
    }
    line.push_str(action);
    Ok(line)
  }

  fn create_directory_idempotent(&self, path: &str) -> ActionPair {
    let p = expanded(path);
    ActionPair {
      create: format!("$p = {}; New-Item -Force -ItemType Directory -Path $p | Out-Null", p),
      delete: format!(
        "$p = {}; if ((Test-Path -Path $p) -and -not (Get-ChildItem -Force -Path $p)) {{ Remove-Item -Force -Path $p }}",
        p
      ),
    }
  }

  fn write_file_idempotent(&self, path: &str, content: &str, elevate: bool) -> FileWrite {
    let backup = backup_path(path);
    let paths = format!("$p = {}; $b = {}; ", expanded(path), expanded(&backup));

    // Same rules as POSIX: keep the oldest backup and never back up our own content.
    let create = format!(
      "{paths}$content = [Console]::In.ReadToEnd(); \
       if ((Test-Path -Path $p) -and -not (Test-Path -Path $b) -and ([IO.File]::ReadAllText($p) -cne $content)) \
       {{ Move-Item -Force -Path $p -Destination $b }}; \
       Set-Content -NoNewline -Path $p -Value $content",
      paths = paths
    );
    let delete = format!(
      "{paths}if (Test-Path -Path $b) {{ Move-Item -Force -Path $b -Destination $p }} \
       else {{ Remove-Item -Force -ErrorAction SilentlyContinue -Path $p }}",
      paths = paths
    );

    FileWrite {
      path: path.to_string(),
      backup_path: backup,
      create,
      delete,
      content: content.to_string(),
      elevate,
    }
  }

  /// cmd.exe syntax; snippets built here expand it before use.
  fn temporary_directory(&self) -> &'static str {
    "%TEMP%"
  }

  fn home_directory(&self) -> &'static str {
    "%HOMEDRIVE%%HOMEPATH%"
  }

  fn join_path(&self, base: &str, child: &str) -> String {
    format!("{}\\{}", base.trim_end_matches(['\\', '/']), child)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn env_assignments_are_prefixed() {
    let mut env = BTreeMap::new();
    env.insert("B".to_string(), "it's".to_string());
    env.insert("A".to_string(), "1".to_string());
    let line = WindowsCommand.build_command_line("whoami", &env, false, false, None).unwrap();
    assert_eq!(line, "$env:A = '1'; $env:B = 'it''s'; whoami");
  }

  #[test]
  fn plain_action_without_env() {
    let line = WindowsCommand
      .build_command_line("whoami", &BTreeMap::new(), false, false, Some(""))
      .unwrap();
    assert_eq!(line, "whoami");
  }

  #[test]
  fn elevation_is_rejected() {
    let err = WindowsCommand
      .build_command_line("whoami", &BTreeMap::new(), true, false, None)
      .unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedElevation { os: "windows", .. }));
  }

  #[test]
  fn run_as_user_is_rejected() {
    let err = WindowsCommand
      .build_command_line("whoami", &BTreeMap::new(), false, false, Some("bob"))
      .unwrap_err();
    assert_eq!(
      err.to_string(),
      "windows targets do not support run as user bob"
    );
  }

  #[test]
  fn password_from_stdin_is_rejected() {
    let result = WindowsCommand.build_command_line("whoami", &BTreeMap::new(), false, true, None);
    assert!(result.is_err());
  }

  #[test]
  fn directory_actions_text() {
    let pair = WindowsCommand.create_directory_idempotent("C:\\app");
    assert_eq!(
      pair.create,
      "$p = [Environment]::ExpandEnvironmentVariables(\"C:\\app\"); New-Item -Force -ItemType Directory -Path $p | Out-Null"
    );
    assert!(pair.delete.starts_with("$p = [Environment]::ExpandEnvironmentVariables(\"C:\\app\");"));
    assert!(pair.delete.contains("Remove-Item -Force -Path $p"));
  }

  #[test]
  fn file_write_text() {
    let write = WindowsCommand.write_file_idempotent("C:\\app\\conf.yaml", "v1", false);
    assert_eq!(write.backup_path, "C:\\app\\conf.yaml.backup");
    assert!(write.create.contains("[Console]::In.ReadToEnd()"));
    assert!(write.create.contains("$b = [Environment]::ExpandEnvironmentVariables(\"C:\\app\\conf.yaml.backup\")"));
    assert!(write.delete.contains("Move-Item -Force -Path $b -Destination $p"));
  }

  #[test]
  fn file_write_skips_backup_of_own_content() {
    let write = WindowsCommand.write_file_idempotent("C:\\app\\conf.yaml", "v1", false);
    let read = write.create.find("ReadToEnd").unwrap();
    let guard = write.create.find("-cne $content").unwrap();
    let set = write.create.find("Set-Content").unwrap();
    assert!(read < guard && guard < set);
  }

  #[test]
  fn cmd_style_roots_are_expanded() {
    let write = WindowsCommand.write_file_idempotent("%TEMP%\\compose-a\\x.yml", "", false);
    assert!(write.create.starts_with("$p = [Environment]::ExpandEnvironmentVariables(\"%TEMP%\\compose-a\\x.yml\");"));
  }

  #[test]
  fn path_roots_and_join() {
    assert_eq!(WindowsCommand.temporary_directory(), "%TEMP%");
    assert_eq!(WindowsCommand.home_directory(), "%HOMEDRIVE%%HOMEPATH%");
    assert_eq!(WindowsCommand.join_path("%TEMP%\\", "a.yml"), "%TEMP%\\a.yml");
  }
}
