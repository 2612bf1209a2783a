//! Target platforms.
//!
//! [`Os`](os::Os) selects the command builder and the local shell;
//! [`Arch`](arch::Arch) selects release binaries such as the compose plugin.

pub mod arch;
pub mod os;

use arch::Arch;
use os::Os;
use std::fmt;

/// An architecture and OS pair (e.g., "aarch64-darwin").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// The machine this process runs on, if supported.
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }

  /// The shell local targets on this platform run under.
  pub fn local_shell(&self) -> &'static str {
    self.os.default_shell()
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}
