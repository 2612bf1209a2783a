//! Docker engine installation and compose stacks.
//!
//! A [`DockerManager`] installs the docker engine and the compose plugin at
//! most once per instance, then brings compose manifest sets up and down as
//! single resources. Installs go through the target's [`PackageManager`], so
//! they join that manager's serialized chain.

mod compose;

use std::collections::BTreeMap;

use tracing::info;

use crate::command::{CommandArgs, ResourceOptions};
use crate::consts::{DEFAULT_COMPOSE_TIMEOUT_SECS, DEFAULT_COMPOSE_VERSION};
use crate::graph::CommandHandle;
use crate::pkg::{EnsureOptions, PackageError, PackageManager};
use crate::platform::os::Os;
use crate::runner::{Runner, RunnerError};

pub use compose::{ComposeManifest, ComposeStack};

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error("docker management is only supported on linux targets, not {0}")]
  UnsupportedOs(Os),

  #[error("package manager for runner {packages} cannot install docker on runner {runner}")]
  RunnerMismatch { runner: String, packages: String },

  #[error("compose stack {0} has no manifests")]
  EmptyManifestSet(String),

  #[error("invalid compose name {0:?}: use letters, digits, '.', '_' or '-'")]
  InvalidName(String),

  #[error("compose stack {stack} has more than one manifest named {manifest}")]
  DuplicateManifest { stack: String, manifest: String },

  #[error("failed to fingerprint compose stack {stack}: {source}")]
  Fingerprint {
    stack: String,
    #[source]
    source: crate::util::hash::HashError,
  },
}

/// Docker manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
  /// Compose plugin release to install.
  pub compose_version: String,
  /// Seconds passed to `up --timeout` and `down -t`.
  pub timeout_secs: u32,
  /// Run compose itself through sudo instead of relying on the docker group.
  pub elevate_compose: bool,
}

impl Default for DockerConfig {
  fn default() -> Self {
    Self {
      compose_version: DEFAULT_COMPOSE_VERSION.to_string(),
      timeout_secs: DEFAULT_COMPOSE_TIMEOUT_SECS,
      elevate_compose: false,
    }
  }
}

/// Installs docker on one runner and manages its compose stacks.
#[derive(Debug, Clone)]
pub struct DockerManager {
  runner: Runner,
  config: DockerConfig,
  install: Option<CommandHandle>,
  compose: Option<CommandHandle>,
}

impl DockerManager {
  pub fn new(runner: Runner, config: DockerConfig) -> Result<Self, DockerError> {
    if runner.os() != Os::Linux {
      return Err(DockerError::UnsupportedOs(runner.os()));
    }
    Ok(Self {
      runner,
      config,
      install: None,
      compose: None,
    })
  }

  pub fn config(&self) -> &DockerConfig {
    &self.config
  }

  /// Ensure the docker engine is installed and the login user can use it.
  ///
  /// Memoized: later calls return the same handle without issuing anything.
  pub fn install(&mut self, packages: &mut PackageManager) -> Result<CommandHandle, DockerError> {
    if let Some(handle) = &self.install {
      return Ok(handle.clone());
    }

    if packages.runner().name() != self.runner.name() {
      return Err(DockerError::RunnerMismatch {
        runner: self.runner.name().to_string(),
        packages: packages.runner().name().to_string(),
      });
    }

    let engine = packages.ensure("docker", EnsureOptions::check_binary("docker"))?;
    let group = self.runner.command(
      "docker-group",
      CommandArgs::create("usermod -a -G docker \"$USER\"").elevated(),
      ResourceOptions::depends_on([engine]),
    )?;

    info!(runner = %self.runner.name(), "docker install registered");
    self.install = Some(group.clone());
    Ok(group)
  }

  /// Ensure the pinned compose plugin is present. Memoized like [`install`](Self::install).
  pub fn ensure_compose(&mut self, packages: &mut PackageManager) -> Result<CommandHandle, DockerError> {
    if let Some(handle) = &self.compose {
      return Ok(handle.clone());
    }

    let installed = self.install(packages)?;
    let args = CommandArgs::create(compose::install_plugin_action(
      &self.config.compose_version,
      self.runner.arch(),
    ))
    .elevated();
    let handle = self
      .runner
      .command("compose-plugin", args, ResourceOptions::depends_on([installed]))?;

    self.compose = Some(handle.clone());
    Ok(handle)
  }

  /// Write `manifests` to the target and bring them up as one stack.
  ///
  /// The combined manifest content and `env` form the stack's trigger: any
  /// edit tears the stack down and brings it back up.
  pub fn compose_up(
    &mut self,
    packages: &mut PackageManager,
    name: &str,
    manifests: &[ComposeManifest],
    env: &BTreeMap<String, String>,
  ) -> Result<ComposeStack, DockerError> {
    compose::validate(name, manifests)?;
    let plugin = self.ensure_compose(packages)?;
    compose::up(&self.runner, &self.config, plugin, name, manifests, env)
  }
}
