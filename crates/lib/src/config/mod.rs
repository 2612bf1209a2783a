//! Host descriptions.
//!
//! A host description is a YAML document listing targets and what to put on
//! each: packages, directories, files, commands, service restarts and compose
//! stacks. [`HostConfig::evaluate`] turns it into a [`Manifest`] through the
//! runners and managers, exactly as a caller using the library directly would.
//!
//! Items refer to each other by reference strings of the form `kind:key`
//! (`pkg:curl`, `dir:/etc/app`, `file:/etc/app/app.conf`, `cmd:migrate`,
//! `service:app`, `compose:agent`). A reference may be qualified with another
//! target's name (`db/cmd:migrate`) when that target is declared earlier.
//!
//! [`Manifest`]: crate::graph::Manifest

mod eval;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_COMPOSE_TIMEOUT_SECS, DEFAULT_COMPOSE_VERSION, DEFAULT_SSH_PORT};
use crate::docker::DockerError;
use crate::pkg::{PackageError, PackageManagerKind};
use crate::platform::arch::Arch;
use crate::platform::os::Os;
use crate::runner::{Readiness, RunnerError};
use crate::service::{ServiceError, ServiceManagerKind};

pub use eval::Evaluation;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("target {0} is declared more than once")]
  DuplicateTarget(String),

  #[error("reference {reference} names unknown target {target}")]
  UnknownTarget { target: String, reference: String },

  #[error("target {target} has nothing named {reference}")]
  UnknownReference { target: String, reference: String },

  #[error("target {target}: {item} needs exactly one of content or source")]
  InvalidContent { target: String, item: String },

  #[error("target {0} declares packages but has no package manager")]
  NoPackageManager(String),

  #[error("target {target} reads its sudo password from unset environment variable {var}")]
  MissingSecret { target: String, var: String },

  #[error("resource graph lock poisoned")]
  Poisoned,

  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Service(#[from] ServiceError),

  #[error(transparent)]
  Docker(#[from] DockerError),
}

/// A whole host description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
  pub targets: Vec<TargetConfig>,
  /// Directory `source` paths are resolved against. Set by [`HostConfig::load`].
  #[serde(skip)]
  pub base_dir: PathBuf,
}

/// One machine and everything placed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
  pub name: String,
  pub os: Os,
  /// Remote targets only, defaulting to x86_64. Local targets use the running machine's.
  #[serde(default)]
  pub arch: Option<Arch>,
  #[serde(default)]
  pub readiness: Readiness,
  /// Absent for the local machine.
  #[serde(default)]
  pub connection: Option<ConnectionConfig>,
  /// Defaults to apt on linux and brew on darwin.
  #[serde(default)]
  pub package_manager: Option<PackageManagerKind>,
  /// Defaults to the usual init system for `os`.
  #[serde(default)]
  pub service_manager: Option<ServiceManagerKind>,
  #[serde(default)]
  pub docker: DockerSettings,
  #[serde(default)]
  pub packages: Vec<PackageSpec>,
  #[serde(default)]
  pub directories: Vec<DirectorySpec>,
  #[serde(default)]
  pub files: Vec<FileSpec>,
  #[serde(default)]
  pub commands: Vec<CommandSpec>,
  #[serde(default)]
  pub services: Vec<ServiceSpec>,
  #[serde(default)]
  pub compose: Vec<ComposeSpec>,
}

fn default_port() -> u16 {
  DEFAULT_SSH_PORT
}

/// Remote connection settings. Secrets are read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  pub user: String,
  #[serde(default)]
  pub private_key_path: Option<PathBuf>,
  /// Environment variable holding the sudo password.
  #[serde(default)]
  pub sudo_password_env: Option<String>,
}

fn default_compose_version() -> String {
  DEFAULT_COMPOSE_VERSION.to_string()
}

fn default_compose_timeout() -> u32 {
  DEFAULT_COMPOSE_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerSettings {
  /// Install the engine even when no compose stack is declared.
  #[serde(default)]
  pub install: bool,
  #[serde(default = "default_compose_version")]
  pub compose_version: String,
  #[serde(default = "default_compose_timeout")]
  pub timeout_secs: u32,
  #[serde(default)]
  pub elevate_compose: bool,
}

impl Default for DockerSettings {
  fn default() -> Self {
    Self {
      install: false,
      compose_version: default_compose_version(),
      timeout_secs: default_compose_timeout(),
      elevate_compose: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
  pub name: String,
  #[serde(default)]
  pub check_binary: Option<String>,
  #[serde(default)]
  pub remove_on_delete: bool,
  #[serde(default)]
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySpec {
  pub path: String,
  #[serde(default)]
  pub elevate: bool,
  #[serde(default)]
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
  pub path: String,
  #[serde(default)]
  pub content: Option<String>,
  /// Local file whose content is written, relative to the description.
  #[serde(default)]
  pub source: Option<PathBuf>,
  #[serde(default)]
  pub elevate: bool,
  #[serde(default)]
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
  pub name: String,
  pub create: Option<String>,
  pub update: Option<String>,
  pub delete: Option<String>,
  pub triggers: Vec<String>,
  pub environment: BTreeMap<String, String>,
  pub elevate: bool,
  pub require_password_from_stdin: bool,
  pub run_as_user: Option<String>,
  pub stdin: Option<String>,
  pub replace_on_changes: bool,
  pub delete_before_replace: bool,
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
  pub name: String,
  pub triggered_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeSpec {
  pub name: String,
  pub manifests: Vec<ComposeFileSpec>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFileSpec {
  pub name: String,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub source: Option<PathBuf>,
}

impl HostConfig {
  /// Read and parse a host description.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    debug!(path = %path.display(), targets = config.targets.len(), "loaded host description");
    Ok(config)
  }

  pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(text)
  }

  pub fn target(&self, name: &str) -> Option<&TargetConfig> {
    self.targets.iter().find(|t| t.name == name)
  }

  /// Read the content of a file or manifest given inline or by `source`.
  fn content(&self, target: &str, item: &str, content: &Option<String>, source: &Option<PathBuf>) -> Result<String, ConfigError> {
    match (content, source) {
      (Some(content), None) => Ok(content.clone()),
      (None, Some(source)) => {
        let path = self.base_dir.join(source);
        fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
      }
      _ => Err(ConfigError::InvalidContent {
        target: target.to_string(),
        item: item.to_string(),
      }),
    }
  }
}
