use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::oscmd::{OsCommand, PosixCommand, WindowsCommand};

/// Operating system families a target can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  #[serde(rename = "darwin", alias = "macos")]
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  /// Whether commands for this OS are POSIX shell text.
  pub fn is_posix(&self) -> bool {
    !matches!(self, Self::Windows)
  }

  /// The shell local commands for this OS run under.
  pub fn default_shell(&self) -> &'static str {
    if self.is_posix() { "bash" } else { "powershell.exe" }
  }

  /// The command builder for this OS family.
  pub fn command_builder(&self) -> &'static dyn OsCommand {
    static POSIX: PosixCommand = PosixCommand;
    static WINDOWS: WindowsCommand = WindowsCommand;
    match self {
      Self::Linux | Self::MacOs => &POSIX,
      Self::Windows => &WINDOWS,
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Error returned when parsing an unknown OS family.
#[derive(Debug, thiserror::Error)]
#[error("unknown OS family: {0}")]
pub struct UnknownOs(pub String);

impl FromStr for Os {
  type Err = UnknownOs;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "linux" => Ok(Self::Linux),
      "darwin" | "macos" => Ok(Self::MacOs),
      "windows" => Ok(Self::Windows),
      other => Err(UnknownOs(other.to_string())),
    }
  }
}
