//! Package manager backends.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
  Apt,
  Yum,
  Dnf,
  Zypper,
  Brew,
}

impl PackageManagerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Apt => "apt",
      Self::Yum => "yum",
      Self::Dnf => "dnf",
      Self::Zypper => "zypper",
      Self::Brew => "brew",
    }
  }
}

impl fmt::Display for PackageManagerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for PackageManagerKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "apt" => Ok(Self::Apt),
      "yum" => Ok(Self::Yum),
      "dnf" => Ok(Self::Dnf),
      "zypper" => Ok(Self::Zypper),
      "brew" => Ok(Self::Brew),
      other => Err(format!("unknown package manager: {}", other)),
    }
  }
}

/// Command templates and name remapping for one package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBackend {
  pub kind: PackageManagerKind,
  pub install: String,
  /// Refreshes the package index; issued once before the first install.
  pub refresh: Option<String>,
  pub remove: String,
  pub elevate: bool,
  /// Generic package names mapped to this backend's names.
  pub remap: BTreeMap<String, String>,
}

impl PackageBackend {
  pub fn new(kind: PackageManagerKind) -> Self {
    let (install, refresh, remove) = match kind {
      PackageManagerKind::Apt => (
        "DEBIAN_FRONTEND=noninteractive apt-get install -y",
        Some("apt-get update -y"),
        "DEBIAN_FRONTEND=noninteractive apt-get remove -y",
      ),
      PackageManagerKind::Yum => ("yum install -y", None, "yum remove -y"),
      PackageManagerKind::Dnf => ("dnf install -y", None, "dnf remove -y"),
      PackageManagerKind::Zypper => ("zypper -n install", None, "zypper -n remove"),
      PackageManagerKind::Brew => ("brew install", Some("brew update"), "brew uninstall"),
    };

    let mut remap = BTreeMap::new();
    if kind == PackageManagerKind::Apt {
      remap.insert("docker".to_string(), "docker.io".to_string());
    }

    Self {
      kind,
      install: install.to_string(),
      refresh: refresh.map(str::to_string),
      remove: remove.to_string(),
      // Homebrew refuses to run as root.
      elevate: kind != PackageManagerKind::Brew,
      remap,
    }
  }

  /// This backend's name for `package`.
  pub fn package_name<'a>(&'a self, package: &'a str) -> &'a str {
    self.remap.get(package).map(String::as_str).unwrap_or(package)
  }

  /// Install action, short-circuited when `check_binary` is already on PATH.
  pub fn install_action(&self, package: &str, check_binary: Option<&str>) -> String {
    let install = format!("{} {}", self.install, self.package_name(package));
    match check_binary {
      Some(binary) => format!(
        "bash -c {}",
        crate::util::shell::single_quote(&format!("command -v {} >/dev/null 2>&1 || {}", binary, install))
      ),
      None => install,
    }
  }

  pub fn remove_action(&self, package: &str) -> String {
    format!("{} {}", self.remove, self.package_name(package))
  }
}
