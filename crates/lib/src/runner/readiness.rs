//! Readiness probes gating every command on a runner.

use serde::{Deserialize, Serialize};

use crate::command::CommandArgs;
use crate::platform::os::Os;

/// The one-time check a target must pass before any other command runs.
///
/// Failure is fatal for everything on the runner; retries, if any, belong to
/// the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Readiness {
  /// No probe.
  #[default]
  None,
  /// Wait until cloud-init has finished (POSIX only).
  CloudInit,
  /// Wait until a login succeeds.
  Login,
  /// Any script that exits zero once the target is usable.
  Custom(String),
}

impl Readiness {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::None => "none",
      Self::CloudInit => "cloud-init",
      Self::Login => "login",
      Self::Custom(_) => "custom",
    }
  }

  /// The probe command for `os`, or `None` when there is nothing to wait for
  /// or the probe does not exist on that OS.
  pub(crate) fn args(&self, os: Os) -> Option<CommandArgs> {
    match self {
      Self::None => None,
      Self::CloudInit if !os.is_posix() => None,
      Self::CloudInit => Some(CommandArgs::create("cloud-init status --wait")),
      Self::Login => Some(CommandArgs::create("whoami")),
      Self::Custom(script) => Some(CommandArgs::create(script.clone())),
    }
  }
}
