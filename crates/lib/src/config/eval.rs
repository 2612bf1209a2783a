//! Evaluating a host description into a manifest.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{ConfigError, HostConfig, TargetConfig};
use crate::command::{CommandArgs, ResourceOptions};
use crate::docker::{ComposeManifest, ComposeStack, DockerConfig, DockerManager};
use crate::graph::{CommandHandle, Manifest, SharedGraph};
use crate::pkg::{EnsureOptions, PackageManager, PackageManagerKind};
use crate::platform::os::Os;
use crate::runner::{Connection, Runner};
use crate::service::{ServiceManager, ServiceManagerKind};

/// The result of evaluating a host description.
#[derive(Debug)]
pub struct Evaluation {
  pub manifest: Manifest,
  /// Runners by target name, carrying the secrets needed to execute.
  pub runners: BTreeMap<String, Runner>,
  pub stacks: Vec<ComposeStack>,
}

/// Handles registered so far, keyed by `target/kind:key`.
#[derive(Default)]
struct Scope {
  handles: BTreeMap<String, CommandHandle>,
}

impl Scope {
  fn insert(&mut self, target: &str, reference: String, handle: CommandHandle) {
    self.handles.insert(format!("{}/{}", target, reference), handle);
  }
}

fn default_package_manager(os: Os) -> Option<PackageManagerKind> {
  match os {
    Os::Linux => Some(PackageManagerKind::Apt),
    Os::MacOs => Some(PackageManagerKind::Brew),
    Os::Windows => None,
  }
}

impl HostConfig {
  /// Register everything the description declares, target by target.
  ///
  /// Within a target, packages come first, then directories, files, commands,
  /// service restarts and compose stacks. A reference must name something
  /// registered before it.
  pub fn evaluate(&self) -> Result<Evaluation, ConfigError> {
    let recorded = Arc::new(Mutex::new(Manifest::default()));
    let graph: SharedGraph = recorded.clone();

    let mut scope = Scope::default();
    let mut runners = BTreeMap::new();
    let mut stacks = Vec::new();

    for target in &self.targets {
      if runners.contains_key(&target.name) {
        return Err(ConfigError::DuplicateTarget(target.name.clone()));
      }
      let runner = self.runner(target, graph.clone())?;
      stacks.extend(self.evaluate_target(target, &runner, &mut scope)?);
      runners.insert(target.name.clone(), runner);
    }

    let manifest = recorded.lock().map_err(|_| ConfigError::Poisoned)?.clone();
    info!(
      targets = runners.len(),
      commands = manifest.len(),
      stacks = stacks.len(),
      "host description evaluated"
    );

    Ok(Evaluation {
      manifest,
      runners,
      stacks,
    })
  }

  fn runner(&self, target: &TargetConfig, graph: SharedGraph) -> Result<Runner, ConfigError> {
    let readiness = target.readiness.clone();
    let Some(conn) = &target.connection else {
      return Ok(Runner::local(&target.name, target.os, readiness, graph)?);
    };

    let mut connection = Connection::new(&conn.host, &conn.user).with_port(conn.port);
    if let Some(key) = &conn.private_key_path {
      connection = connection.with_private_key(key);
    }
    if let Some(var) = &conn.sudo_password_env {
      let password = std::env::var(var).map_err(|_| ConfigError::MissingSecret {
        target: target.name.clone(),
        var: var.clone(),
      })?;
      connection = connection.with_sudo_password(password);
    }

    Ok(Runner::remote(
      &target.name,
      connection,
      target.os,
      target.arch.unwrap_or_default(),
      readiness,
      graph,
    )?)
  }

  /// Resolve `reference` as seen from `current`.
  fn lookup(&self, scope: &Scope, current: &str, reference: &str) -> Result<CommandHandle, ConfigError> {
    let unknown = |target: &str| ConfigError::UnknownReference {
      target: target.to_string(),
      reference: reference.to_string(),
    };

    let Some((head, key)) = reference.split_once(':') else {
      return Err(unknown(current));
    };
    let (target, local) = match head.split_once('/') {
      Some((target, kind)) => (target, format!("{}:{}", kind, key)),
      None => (current, reference.to_string()),
    };

    if self.target(target).is_none() {
      return Err(ConfigError::UnknownTarget {
        target: target.to_string(),
        reference: reference.to_string(),
      });
    }

    scope
      .handles
      .get(&format!("{}/{}", target, local))
      .cloned()
      .ok_or_else(|| unknown(target))
  }

  fn lookup_all(&self, scope: &Scope, current: &str, references: &[String]) -> Result<Vec<CommandHandle>, ConfigError> {
    references.iter().map(|r| self.lookup(scope, current, r)).collect()
  }

  fn evaluate_target(
    &self,
    target: &TargetConfig,
    runner: &Runner,
    scope: &mut Scope,
  ) -> Result<Vec<ComposeStack>, ConfigError> {
    let name = target.name.as_str();
    let needs_docker = target.docker.install || !target.compose.is_empty();

    let mut packages = match target.package_manager.or_else(|| default_package_manager(target.os)) {
      Some(kind) => Some(PackageManager::for_kind(runner.clone(), kind)),
      None if target.packages.is_empty() && !needs_docker => None,
      None => return Err(ConfigError::NoPackageManager(name.to_string())),
    };

    if let Some(pm) = packages.as_mut() {
      for spec in &target.packages {
        let options = EnsureOptions {
          check_binary: spec.check_binary.clone(),
          remove_on_delete: spec.remove_on_delete,
          depends_on: self.lookup_all(scope, name, &spec.depends_on)?,
        };
        let handle = pm.ensure(&spec.name, options)?;
        scope.insert(name, format!("pkg:{}", spec.name), handle);
      }
    }

    for spec in &target.directories {
      let options = ResourceOptions::depends_on(self.lookup_all(scope, name, &spec.depends_on)?);
      let handle = runner.create_directory(&spec.path, spec.elevate, options)?;
      scope.insert(name, format!("dir:{}", spec.path), handle);
    }

    for spec in &target.files {
      let content = self.content(name, &spec.path, &spec.content, &spec.source)?;
      let options = ResourceOptions::depends_on(self.lookup_all(scope, name, &spec.depends_on)?);
      let handle = runner.write_file(&spec.path, &content, spec.elevate, options)?;
      scope.insert(name, format!("file:{}", spec.path), handle);
    }

    for spec in &target.commands {
      let args = CommandArgs {
        create: spec.create.clone(),
        update: spec.update.clone(),
        delete: spec.delete.clone(),
        triggers: spec.triggers.clone(),
        environment: spec.environment.clone(),
        elevate: spec.elevate,
        require_password_from_stdin: spec.require_password_from_stdin,
        run_as_user: spec.run_as_user.clone(),
        stdin: spec.stdin.clone(),
      };
      let options = ResourceOptions {
        depends_on: self.lookup_all(scope, name, &spec.depends_on)?,
        replace_on_changes: spec.replace_on_changes,
        delete_before_replace: spec.delete_before_replace,
      };
      let handle = runner.command(&spec.name, args, options)?;
      scope.insert(name, format!("cmd:{}", spec.name), handle);
    }

    if !target.services.is_empty() {
      let kind = target
        .service_manager
        .unwrap_or_else(|| ServiceManagerKind::for_os(target.os));
      let services = ServiceManager::new(runner.clone(), kind);
      for spec in &target.services {
        let triggers = self.lookup_all(scope, name, &spec.triggered_by)?;
        let handle = services.ensure_restarted(&spec.name, &triggers)?;
        scope.insert(name, format!("service:{}", spec.name), handle);
      }
    }

    let mut stacks = Vec::new();
    if let (true, Some(pm)) = (needs_docker, packages.as_mut()) {
      let config = DockerConfig {
        compose_version: target.docker.compose_version.clone(),
        timeout_secs: target.docker.timeout_secs,
        elevate_compose: target.docker.elevate_compose,
      };
      let mut docker = DockerManager::new(runner.clone(), config)?;
      let engine = docker.install(pm)?;
      scope.insert(name, "docker:engine".to_string(), engine);

      for spec in &target.compose {
        let manifests = spec
          .manifests
          .iter()
          .map(|m| {
            let item = format!("compose {} manifest {}", spec.name, m.name);
            let content = self.content(name, &item, &m.content, &m.source)?;
            Ok(ComposeManifest::new(&m.name, content))
          })
          .collect::<Result<Vec<_>, ConfigError>>()?;

        let stack = docker.compose_up(pm, &spec.name, &manifests, &spec.env)?;
        scope.insert(name, format!("compose:{}", spec.name), stack.handle.clone());
        stacks.push(stack);
      }
    }

    debug!(target = %name, "target evaluated");
    Ok(stacks)
  }
}
