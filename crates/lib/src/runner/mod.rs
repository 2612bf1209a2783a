//! Runners bind command descriptors to an execution target.
//!
//! A runner resolves every descriptor through its OS family's command
//! builder, makes it depend on the runner's readiness probe, and registers it
//! with the shared resource graph. Local and remote runners differ only in
//! their [`Target`].

mod connection;
mod readiness;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::{CommandArgs, CommandResource, ResolveError, ResourceOptions};
use crate::graph::{self, CommandHandle, GraphError, SharedGraph};
use crate::oscmd::OsCommand;
use crate::platform::arch::Arch;
use crate::platform::os::Os;
use crate::transport::{self, CommandOutput, TransportConfig, TransportError};

pub use connection::{Connection, Target, TargetDef};
pub use readiness::Readiness;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("readiness probe {readiness} is not available on {os}")]
  UnsupportedReadiness { readiness: &'static str, os: Os },
}

/// Which action of a resource to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Create,
  Update,
  Delete,
}

impl FromStr for Phase {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "create" => Ok(Self::Create),
      "update" => Ok(Self::Update),
      "delete" => Ok(Self::Delete),
      other => Err(format!("unknown phase: {}", other)),
    }
  }
}

/// Binds commands to one target and registers them with the graph.
///
/// Cloning is cheap; clones share the graph and readiness handle.
#[derive(Clone)]
pub struct Runner {
  name: String,
  target: Target,
  os: Os,
  arch: Arch,
  graph: SharedGraph,
  ready: Option<CommandHandle>,
}

impl std::fmt::Debug for Runner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Runner")
      .field("name", &self.name)
      .field("target", &self.target)
      .field("os", &self.os)
      .field("arch", &self.arch)
      .field("ready", &self.ready)
      .finish()
  }
}

impl Runner {
  /// A runner for the local machine.
  pub fn local(name: &str, os: Os, readiness: Readiness, graph: SharedGraph) -> Result<Self, RunnerError> {
    let arch = Arch::current().unwrap_or_default();
    Self::new(name, Target::Local, os, arch, readiness, graph)
  }

  /// A runner for a remote host reached through `connection`.
  pub fn remote(
    name: &str,
    connection: Connection,
    os: Os,
    arch: Arch,
    readiness: Readiness,
    graph: SharedGraph,
  ) -> Result<Self, RunnerError> {
    Self::new(name, Target::Remote(connection), os, arch, readiness, graph)
  }

  fn new(
    name: &str,
    target: Target,
    os: Os,
    arch: Arch,
    readiness: Readiness,
    graph: SharedGraph,
  ) -> Result<Self, RunnerError> {
    if readiness == Readiness::CloudInit && !os.is_posix() {
      return Err(RunnerError::UnsupportedReadiness {
        readiness: readiness.as_str(),
        os,
      });
    }

    let mut runner = Self {
      name: name.to_string(),
      target,
      os,
      arch,
      graph,
      ready: None,
    };

    if let Some(args) = readiness.args(os) {
      let handle = runner.command("wait-ready", args, ResourceOptions::default())?;
      info!(runner = %runner.name, probe = readiness.as_str(), "readiness probe registered");
      runner.ready = Some(handle);
    }

    Ok(runner)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn os(&self) -> Os {
    self.os
  }

  pub fn arch(&self) -> Arch {
    self.arch
  }

  pub fn target(&self) -> &Target {
    &self.target
  }

  /// The command builder in effect for this runner's target.
  pub fn os_command(&self) -> &'static dyn OsCommand {
    self.os.command_builder()
  }

  /// Handle of the readiness probe, if the runner has one.
  pub fn ready(&self) -> Option<&CommandHandle> {
    self.ready.as_ref()
  }

  /// Graph-wide name of a command issued on this runner.
  pub fn resource_name(&self, name: &str) -> String {
    format!("{}-{}", self.name, name)
  }

  /// Resolve `args` and register it with the graph.
  ///
  /// The command depends on the readiness probe and on every handle in
  /// `options.depends_on`.
  pub fn command(&self, name: &str, args: CommandArgs, options: ResourceOptions) -> Result<CommandHandle, RunnerError> {
    let full_name = self.resource_name(name);
    let resolved = args.resolve(&full_name, self.os)?;

    let password_on_stdin = args.needs_password();
    if password_on_stdin && self.target.sudo_password().is_none() {
      return Err(
        ResolveError::MissingSudoPassword {
          name: full_name,
          target: self.target.to_string(),
        }
        .into(),
      );
    }

    let mut depends_on: Vec<String> = Vec::new();
    for dep in self.ready.iter().chain(options.depends_on.iter()) {
      if !depends_on.contains(&dep.name) {
        depends_on.push(dep.name.clone());
      }
    }

    debug!(name = %full_name, create = %resolved.create, "resolved command");

    let resource = CommandResource {
      name: full_name,
      runner: self.name.clone(),
      target: self.target.def(),
      os: self.os,
      create: resolved.create,
      update: resolved.update,
      delete: resolved.delete,
      stdin: args.stdin,
      password_on_stdin,
      triggers: args.triggers,
      depends_on,
      replace_on_changes: options.replace_on_changes,
      delete_before_replace: options.delete_before_replace,
    };

    let handle = graph::register(&self.graph, resource)?;
    info!(name = %handle.name, runner = %self.name, "registered command");
    Ok(handle)
  }

  /// Register an idempotent directory creation.
  pub fn create_directory(
    &self,
    path: &str,
    elevate: bool,
    options: ResourceOptions,
  ) -> Result<CommandHandle, RunnerError> {
    let pair = self.os_command().create_directory_idempotent(path);
    let mut args = CommandArgs::create(pair.create).with_delete(pair.delete);
    args.elevate = elevate;
    self.command(&format!("mkdir-{}", path), args, options)
  }

  /// Register a managed file write with backup/restore semantics.
  ///
  /// Any change to the path, content or flags replaces the write, deleting
  /// (restoring) first.
  pub fn write_file(
    &self,
    path: &str,
    content: &str,
    elevate: bool,
    options: ResourceOptions,
  ) -> Result<CommandHandle, RunnerError> {
    let write = self.os_command().write_file_idempotent(path, content, elevate);
    let mut args = CommandArgs::create(write.create.clone())
      .with_delete(write.delete.clone())
      .with_stdin(write.content.clone())
      .with_trigger(write.create)
      .with_trigger(write.delete)
      .with_trigger(write.content)
      .with_trigger(write.elevate.to_string());
    args.elevate = write.elevate;
    self.command(&format!("write-{}", path), args, options.replace())
  }

  /// Run one action of a registered resource on this runner's target.
  ///
  /// `Update` falls back to the create action. Returns `Ok(None)` when the
  /// resource has no delete action. A non-zero exit is returned unchanged;
  /// nothing here retries.
  pub async fn execute(
    &self,
    resource: &CommandResource,
    phase: Phase,
    config: &TransportConfig,
  ) -> Result<Option<CommandOutput>, TransportError> {
    let script = match phase {
      Phase::Create => Some(resource.create.as_str()),
      Phase::Update => Some(resource.update.as_deref().unwrap_or(&resource.create)),
      Phase::Delete => resource.delete.as_deref(),
    };
    let Some(script) = script else {
      debug!(name = %resource.name, "no delete action");
      return Ok(None);
    };

    let stdin = match (resource.password_on_stdin, self.target.sudo_password()) {
      (true, Some(password)) => Some(format!("{}\n{}", password, resource.stdin.as_deref().unwrap_or(""))),
      (true, None) => return Err(TransportError::MissingSudoPassword(resource.name.clone())),
      (false, _) => resource.stdin.clone(),
    };

    info!(name = %resource.name, phase = ?phase, target = %self.target, "executing");
    transport::run(&self.target, self.os, script, stdin.as_deref(), config)
      .await
      .map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::recording_graph;

  #[test]
  fn commands_depend_on_readiness() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::remote(
      "web",
      Connection::new("10.0.0.5", "ubuntu"),
      Os::Linux,
      Arch::X86_64,
      Readiness::CloudInit,
      graph,
    )
    .unwrap();

    let handle = runner
      .command("hello", CommandArgs::create("echo hi"), ResourceOptions::default())
      .unwrap();

    let manifest = manifest.lock().unwrap();
    let ready = manifest.get("web-wait-ready").unwrap();
    assert_eq!(ready.create, "cloud-init status --wait");
    assert!(ready.depends_on.is_empty());

    let cmd = manifest.get(&handle.name).unwrap();
    assert_eq!(handle.name, "web-hello");
    assert_eq!(cmd.depends_on, vec!["web-wait-ready"]);
    assert_eq!(
      cmd.target,
      TargetDef::Remote {
        host: "10.0.0.5".to_string(),
        port: 22,
        user: "ubuntu".to_string(),
        private_key_path: None,
      }
    );
  }

  #[test]
  fn local_runner_without_probe_has_no_gate() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::local("local", Os::Linux, Readiness::None, graph).unwrap();
    assert!(runner.ready().is_none());
    runner
      .command("hello", CommandArgs::create("echo hi"), ResourceOptions::default())
      .unwrap();
    assert!(manifest.lock().unwrap().get("local-hello").unwrap().depends_on.is_empty());
  }

  #[test]
  fn duplicate_names_fail() {
    let (_, graph) = recording_graph();
    let runner = Runner::local("local", Os::Linux, Readiness::None, graph).unwrap();
    runner
      .command("x", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap();
    let err = runner
      .command("x", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap_err();
    assert!(matches!(err, RunnerError::Graph(GraphError::DuplicateName(_))));
  }

  #[test]
  fn explicit_dependencies_are_deduplicated() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::local("local", Os::Linux, Readiness::Login, graph).unwrap();
    let ready = runner.ready().cloned().unwrap();
    let first = runner
      .command("a", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap();
    runner
      .command(
        "b",
        CommandArgs::create("true"),
        ResourceOptions::depends_on([ready, first.clone(), first]),
      )
      .unwrap();
    assert_eq!(
      manifest.lock().unwrap().get("local-b").unwrap().depends_on,
      vec!["local-wait-ready", "local-a"]
    );
  }

  #[test]
  fn windows_rejects_elevation_at_registration() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::remote(
      "win",
      Connection::new("10.0.0.9", "Administrator"),
      Os::Windows,
      Arch::X86_64,
      Readiness::Login,
      graph,
    )
    .unwrap();
    let err = runner
      .command("x", CommandArgs::create("whoami").elevated(), ResourceOptions::default())
      .unwrap_err();
    assert!(matches!(
      err,
      RunnerError::Resolve(ResolveError::UnsupportedElevation { .. })
    ));
    assert!(manifest.lock().unwrap().get("win-x").is_none());
  }

  #[test]
  fn cloud_init_probe_is_posix_only() {
    let (_, graph) = recording_graph();
    let err = Runner::local("w", Os::Windows, Readiness::CloudInit, graph).unwrap_err();
    assert!(matches!(err, RunnerError::UnsupportedReadiness { .. }));
  }

  #[test]
  fn password_from_stdin_requires_a_password() {
    let (_, graph) = recording_graph();
    let runner = Runner::remote(
      "web",
      Connection::new("h", "u"),
      Os::Linux,
      Arch::X86_64,
      Readiness::None,
      graph,
    )
    .unwrap();
    let mut args = CommandArgs::create("whoami").elevated();
    args.require_password_from_stdin = true;
    let err = runner.command("x", args, ResourceOptions::default()).unwrap_err();
    assert!(matches!(
      err,
      RunnerError::Resolve(ResolveError::MissingSudoPassword { .. })
    ));
  }

  #[test]
  fn password_is_not_recorded() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::remote(
      "web",
      Connection::new("h", "u").with_sudo_password("hunter2"),
      Os::Linux,
      Arch::X86_64,
      Readiness::None,
      graph,
    )
    .unwrap();
    let mut args = CommandArgs::create("whoami").elevated();
    args.require_password_from_stdin = true;
    runner.command("x", args, ResourceOptions::default()).unwrap();

    let manifest = manifest.lock().unwrap();
    let cmd = manifest.get("web-x").unwrap();
    assert_eq!(cmd.create, "sudo -S whoami");
    assert!(cmd.password_on_stdin);
    assert!(!serde_json::to_string(&*manifest).unwrap().contains("hunter2"));
  }

  #[test]
  fn write_file_is_replace_only() {
    let (manifest, graph) = recording_graph();
    let runner = Runner::local("local", Os::Linux, Readiness::None, graph).unwrap();
    let dir = runner
      .create_directory("/etc/app", true, ResourceOptions::default())
      .unwrap();
    let file = runner
      .write_file("/etc/app/conf.yaml", "v1", true, ResourceOptions::depends_on([dir]))
      .unwrap();

    let manifest = manifest.lock().unwrap();
    let cmd = manifest.get(&file.name).unwrap();
    assert_eq!(file.name, "local-write-/etc/app/conf.yaml");
    assert!(cmd.create.starts_with("sudo bash -c "));
    assert_eq!(cmd.stdin.as_deref(), Some("v1"));
    assert!(cmd.replace_on_changes);
    assert!(cmd.delete_before_replace);
    assert_eq!(cmd.depends_on, vec!["local-mkdir-/etc/app"]);
    assert_eq!(
      manifest.get("local-mkdir-/etc/app").unwrap().create,
      "sudo mkdir -p \"/etc/app\""
    );
  }

  #[test]
  fn phase_parsing() {
    assert_eq!("delete".parse::<Phase>().unwrap(), Phase::Delete);
    assert!("destroy".parse::<Phase>().is_err());
  }
}
