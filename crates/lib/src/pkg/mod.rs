//! Serialized package installation.
//!
//! Package managers hold a global lock on the target, so every `ensure` on
//! one [`PackageManager`] depends on the previous one. The chain lives on the
//! instance: two managers (two targets) never depend on each other.

mod backend;

use tracing::info;

use crate::command::{CommandArgs, ResourceOptions};
use crate::graph::CommandHandle;
use crate::runner::{Runner, RunnerError};
use crate::util::hash::hash_bytes;

pub use backend::{PackageBackend, PackageManagerKind};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error("package name must not be empty")]
  EmptyPackage,
}

/// Options for a single `ensure` call.
#[derive(Debug, Clone, Default)]
pub struct EnsureOptions {
  /// Skip the install when this binary already resolves on PATH.
  pub check_binary: Option<String>,
  /// Uninstall the package when the resource is destroyed.
  pub remove_on_delete: bool,
  /// Extra dependencies on top of the manager's own chain.
  pub depends_on: Vec<CommandHandle>,
}

impl EnsureOptions {
  pub fn check_binary(binary: impl Into<String>) -> Self {
    Self {
      check_binary: Some(binary.into()),
      ..Default::default()
    }
  }
}

/// Issues package installs on one runner, strictly one after another.
#[derive(Debug, Clone)]
pub struct PackageManager {
  runner: Runner,
  backend: PackageBackend,
  refresh: Option<CommandHandle>,
  last: Option<CommandHandle>,
}

impl PackageManager {
  pub fn new(runner: Runner, backend: PackageBackend) -> Self {
    Self {
      runner,
      backend,
      refresh: None,
      last: None,
    }
  }

  pub fn for_kind(runner: Runner, kind: PackageManagerKind) -> Self {
    Self::new(runner, PackageBackend::new(kind))
  }

  pub fn backend(&self) -> &PackageBackend {
    &self.backend
  }

  pub fn runner(&self) -> &Runner {
    &self.runner
  }

  /// The most recently issued command in this manager's chain.
  pub fn last(&self) -> Option<&CommandHandle> {
    self.last.as_ref()
  }

  /// Ensure `package` is installed.
  ///
  /// The first call on a backend with a refresh command also issues the
  /// index refresh. Every call depends on the previous one.
  pub fn ensure(&mut self, package: &str, options: EnsureOptions) -> Result<CommandHandle, PackageError> {
    if package.trim().is_empty() {
      return Err(PackageError::EmptyPackage);
    }

    self.refresh_index()?;

    let create = self.backend.install_action(package, options.check_binary.as_deref());
    let mut args = CommandArgs::create(create.clone());
    args.elevate = self.backend.elevate;
    if options.remove_on_delete {
      args.delete = Some(self.backend.remove_action(package));
    }

    let mut deps: Vec<CommandHandle> = self.refresh.iter().chain(self.last.iter()).cloned().collect();
    deps.extend(options.depends_on);

    let name = format!("install-{}-{}", package, hash_bytes(create.as_bytes()).short());
    let handle = self.runner.command(&name, args, ResourceOptions::depends_on(deps))?;

    info!(package = %package, backend = %self.backend.kind, name = %handle.name, "package ensured");
    self.last = Some(handle.clone());
    Ok(handle)
  }

  /// Issue the index refresh once; later calls reuse the handle.
  fn refresh_index(&mut self) -> Result<(), PackageError> {
    if self.refresh.is_some() {
      return Ok(());
    }
    let Some(refresh) = self.backend.refresh.clone() else {
      return Ok(());
    };

    let mut args = CommandArgs::create(refresh);
    args.elevate = self.backend.elevate;
    let deps: Vec<CommandHandle> = self.last.iter().cloned().collect();
    let handle = self
      .runner
      .command("refresh-index", args, ResourceOptions::depends_on(deps))?;

    self.last = Some(handle.clone());
    self.refresh = Some(handle);
    Ok(())
  }
}
