use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU architecture of a target host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  #[default]
  #[serde(alias = "amd64")]
  X86_64,
  #[serde(alias = "arm64")]
  Aarch64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn release_aliases_parse() {
    let arch: Arch = serde_yaml::from_str("arm64").unwrap();
    assert_eq!(arch, Arch::Aarch64);
    let arch: Arch = serde_yaml::from_str("amd64").unwrap();
    assert_eq!(arch, Arch::X86_64);
    assert_eq!(Arch::default().as_str(), "x86_64");
  }
}
