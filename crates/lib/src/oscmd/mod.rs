//! OS command builders.
//!
//! A target's OS family selects exactly one builder (see
//! [`Os::command_builder`](crate::platform::os::Os::command_builder)), which
//! turns abstract actions into the literal text handed to the transport:
//! POSIX shell for Linux/macOS, PowerShell for Windows.
//!
//! Everything here is pure string generation. Identical inputs always
//! produce byte-identical output, which keeps change detection stable.

mod posix;
mod windows;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::command::ResolveError;

pub use posix::PosixCommand;
pub use windows::WindowsCommand;

/// A create action paired with the action that reverses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPair {
  pub create: String,
  pub delete: String,
}

/// A managed file write with backup/restore semantics.
///
/// The create action moves any pre-existing file at `path` to `backup_path`
/// and writes `content` (streamed on stdin). Running it again is harmless: a
/// file that already holds `content` is not backed up. The delete action
/// restores the backup when present and removes `path` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
  pub path: String,
  pub backup_path: String,
  pub create: String,
  pub delete: String,
  pub content: String,
  pub elevate: bool,
}

/// Capability set every OS family provides.
pub trait OsCommand: Send + Sync {
  /// Short family name used in errors and logs.
  fn family(&self) -> &'static str;

  /// Wrap `action` with environment assignments and elevation syntax.
  fn build_command_line(
    &self,
    action: &str,
    env: &BTreeMap<String, String>,
    elevate: bool,
    require_password_from_stdin: bool,
    run_as_user: Option<&str>,
  ) -> Result<String, ResolveError>;

  /// Create `path` if missing; the delete action only removes it when empty.
  fn create_directory_idempotent(&self, path: &str) -> ActionPair;

  /// Write `content` to `path`, backing up whatever was there.
  fn write_file_idempotent(&self, path: &str, content: &str, elevate: bool) -> FileWrite;

  fn temporary_directory(&self) -> &'static str;

  fn home_directory(&self) -> &'static str;

  /// Join a child name onto a directory using the family's separator.
  fn join_path(&self, base: &str, child: &str) -> String;
}

/// Path of the backup kept for a managed file.
pub fn backup_path(path: &str) -> String {
  format!("{}.{}", path, crate::consts::BACKUP_SUFFIX)
}

/// Path new content is staged at before it is moved over `path`.
pub fn staging_path(path: &str) -> String {
  format!("{}.{}", path, crate::consts::STAGING_SUFFIX)
}

/// Reject environment names neither shell can assign.
fn validate_env(env: &BTreeMap<String, String>) -> Result<(), ResolveError> {
  match env.keys().find(|k| !crate::util::shell::is_valid_env_name(k)) {
    Some(name) => Err(ResolveError::InvalidEnvName(name.clone())),
    None => Ok(()),
  }
}
