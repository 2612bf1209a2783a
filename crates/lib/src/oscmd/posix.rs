//! POSIX shell command builder (Linux, macOS).

use std::collections::BTreeMap;

use super::{ActionPair, FileWrite, OsCommand, backup_path, staging_path, validate_env};
use crate::command::ResolveError;
use crate::util::shell::{double_quote, is_valid_user_name, single_quote};

/// Builds `bash`/`sudo` command lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixCommand;

impl PosixCommand {
  /// `bash -c '<script>'` with the script fully escaped.
  fn bash(script: &str) -> String {
    format!("bash -c {}", single_quote(script))
  }
}

impl OsCommand for PosixCommand {
  fn family(&self) -> &'static str {
    "posix"
  }

  fn build_command_line(
    &self,
    action: &str,
    env: &BTreeMap<String, String>,
    elevate: bool,
    require_password_from_stdin: bool,
    run_as_user: Option<&str>,
  ) -> Result<String, ResolveError> {
    validate_env(env)?;
    let run_as_user = run_as_user.filter(|u| !u.is_empty());
    if let Some(user) = run_as_user.filter(|u| !is_valid_user_name(u)) {
      return Err(ResolveError::InvalidUser(user.to_string()));
    }

    let assignments: Vec<String> = env
      .iter()
      .map(|(name, value)| format!("{}={}", name, double_quote(value)))
      .collect();
    // sudo resets the environment, so elevated commands get theirs through env(1).
    let elevated_env = if assignments.is_empty() {
      String::new()
    } else {
      format!("env {} ", assignments.join(" "))
    };

    let sudo = if require_password_from_stdin { "sudo -S" } else { "sudo" };
    let line = match run_as_user {
      Some(user) => format!("{} -u {} {}{}", sudo, user, elevated_env, Self::bash(action)),
      None if elevate => format!("{} {}{}", sudo, elevated_env, action),
      None if assignments.is_empty() => action.to_string(),
      None => format!("{} {}", assignments.join(" "), action),
    };
    Ok(line)
  }

  fn create_directory_idempotent(&self, path: &str) -> ActionPair {
    let quoted = double_quote(path);
    ActionPair {
      create: format!("mkdir -p {}", quoted),
      delete: Self::bash(&format!(
        "if [ -d {p} ] && [ -z \"$(ls -A {p})\" ]; then rmdir {p}; fi",
        p = quoted
      )),
    }
  }

  fn write_file_idempotent(&self, path: &str, content: &str, elevate: bool) -> FileWrite {
    let backup = backup_path(path);
    let p = double_quote(path);
    let b = double_quote(&backup);
    let t = double_quote(&staging_path(path));

    // An existing backup is the oldest pre-existing copy; never overwrite it.
    // A file already holding the new content is our own earlier write, not an original.
    let create = Self::bash(&format!(
      "cat > {t} || {{ rm -f {t}; exit 1; }}; \
       if [ -f {p} ] && [ ! -e {b} ] && ! cmp -s {p} {t}; then mv -f {p} {b}; fi; \
       mv -f {t} {p}",
      p = p,
      b = b,
      t = t
    ));
    let delete = Self::bash(&format!(
      "if [ -f {b} ]; then mv -f {b} {p}; else rm -f {p}; fi",
      p = p,
      b = b
    ));

    FileWrite {
      path: path.to_string(),
      backup_path: backup,
      create,
      delete,
      content: content.to_string(),
      elevate,
    }
  }

  fn temporary_directory(&self) -> &'static str {
    "/tmp"
  }

  fn home_directory(&self) -> &'static str {
    "$HOME"
  }

  fn join_path(&self, base: &str, child: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), child)
  }
}
