//! Service restarts triggered by configuration changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{CommandArgs, ResourceOptions};
use crate::graph::CommandHandle;
use crate::platform::os::Os;
use crate::runner::{Runner, RunnerError};
use crate::util::shell::ps_single_quote;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error("restart of {0} has no triggering change")]
  MissingTrigger(String),
}

/// Init systems a target can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceManagerKind {
  Systemd,
  #[serde(rename = "sysvinit")]
  SysVinit,
  Launchd,
  WindowsService,
}

impl ServiceManagerKind {
  /// The usual init system for `os`.
  pub fn for_os(os: Os) -> Self {
    match os {
      Os::Linux => Self::Systemd,
      Os::MacOs => Self::Launchd,
      Os::Windows => Self::WindowsService,
    }
  }

  fn restart_action(&self, service: &str) -> String {
    match self {
      Self::Systemd => format!("systemctl restart {}", service),
      Self::SysVinit => format!("service {} restart", service),
      Self::Launchd => format!("launchctl kickstart -k system/{}", service),
      Self::WindowsService => format!("Restart-Service -Name {}", ps_single_quote(service)),
    }
  }

  fn elevate(&self) -> bool {
    !matches!(self, Self::WindowsService)
  }
}

impl fmt::Display for ServiceManagerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Systemd => "systemd",
      Self::SysVinit => "sysvinit",
      Self::Launchd => "launchd",
      Self::WindowsService => "windows-service",
    };
    write!(f, "{}", name)
  }
}

/// Restarts services on one runner.
#[derive(Debug, Clone)]
pub struct ServiceManager {
  runner: Runner,
  kind: ServiceManagerKind,
}

impl ServiceManager {
  pub fn new(runner: Runner, kind: ServiceManagerKind) -> Self {
    Self { runner, kind }
  }

  /// A manager using the usual init system for the runner's OS.
  pub fn for_runner(runner: Runner) -> Self {
    let kind = ServiceManagerKind::for_os(runner.os());
    Self::new(runner, kind)
  }

  pub fn kind(&self) -> ServiceManagerKind {
    self.kind
  }

  /// Restart `service` whenever any of `triggered_by` changes.
  ///
  /// The restart depends on the triggering commands and carries their
  /// fingerprints as triggers, so it only fires again when one of them
  /// actually changed.
  pub fn ensure_restarted(&self, service: &str, triggered_by: &[CommandHandle]) -> Result<CommandHandle, ServiceError> {
    if triggered_by.is_empty() {
      return Err(ServiceError::MissingTrigger(service.to_string()));
    }

    let mut args = CommandArgs::create(self.kind.restart_action(service));
    args.elevate = self.kind.elevate();
    args.triggers = triggered_by.iter().map(CommandHandle::trigger).collect();

    let options = ResourceOptions {
      depends_on: triggered_by.to_vec(),
      replace_on_changes: true,
      delete_before_replace: false,
    };
    let handle = self.runner.command(&format!("restart-{}", service), args, options)?;

    info!(service = %service, manager = %self.kind, name = %handle.name, "restart registered");
    Ok(handle)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::command::CommandResource;
  use crate::runner::Readiness;
  use crate::util::testutil::recording_graph;

  fn restart_for(kind: ServiceManagerKind, os: Os) -> CommandResource {
    let (manifest, graph) = recording_graph();
    let runner = Runner::local("h", os, Readiness::None, graph).unwrap();
    let conf = runner
      .command("conf", CommandArgs::create("true"), ResourceOptions::default())
      .unwrap();
    let handle = ServiceManager::new(runner, kind).ensure_restarted("app", &[conf]).unwrap();
    let manifest = manifest.lock().unwrap();
    manifest.get(&handle.name).cloned().unwrap()
  }

  #[test]
  fn restart_commands_per_init_system() {
    assert_eq!(restart_for(ServiceManagerKind::Systemd, Os::Linux).create, "sudo systemctl restart app");
    assert_eq!(restart_for(ServiceManagerKind::SysVinit, Os::Linux).create, "sudo service app restart");
    assert_eq!(
      restart_for(ServiceManagerKind::Launchd, Os::MacOs).create,
      "sudo launchctl kickstart -k system/app"
    );
    assert_eq!(
      restart_for(ServiceManagerKind::WindowsService, Os::Windows).create,
      "Restart-Service -Name 'app'"
    );
  }

  #[test]
  fn restart_depends_on_and_is_triggered_by_change() {
    let restart = restart_for(ServiceManagerKind::Systemd, Os::Linux);
    assert_eq!(restart.depends_on, vec!["h-conf"]);
    assert_eq!(restart.triggers.len(), 1);
    assert!(restart.triggers[0].starts_with("h-conf:"));
    assert!(restart.replace_on_changes);
  }

  #[test]
  fn trigger_tracks_config_content() {
    let restart_after = |content: &str| {
      let (manifest, graph) = recording_graph();
      let runner = Runner::local("h", Os::Linux, Readiness::None, graph).unwrap();
      let conf = runner
        .write_file("/etc/app.conf", content, true, ResourceOptions::default())
        .unwrap();
      let handle = ServiceManager::for_runner(runner).ensure_restarted("app", &[conf]).unwrap();
      let manifest = manifest.lock().unwrap();
      manifest.get(&handle.name).cloned().unwrap()
    };

    let a = restart_after("a=1");
    assert_eq!(restart_after("a=1").change_against(&a).unwrap(), crate::command::Change::None);
    assert!(matches!(
      restart_after("a=2").change_against(&a).unwrap(),
      crate::command::Change::Replace { .. }
    ));
  }

  #[test]
  fn restart_without_trigger_is_rejected() {
    let (_, graph) = recording_graph();
    let runner = Runner::local("h", Os::Linux, Readiness::None, graph).unwrap();
    let err = ServiceManager::for_runner(runner).ensure_restarted("app", &[]).unwrap_err();
    assert!(matches!(err, ServiceError::MissingTrigger(s) if s == "app"));
  }

  #[test]
  fn default_kind_per_os() {
    assert_eq!(ServiceManagerKind::for_os(Os::Linux), ServiceManagerKind::Systemd);
    assert_eq!(ServiceManagerKind::for_os(Os::MacOs), ServiceManagerKind::Launchd);
    assert_eq!(ServiceManagerKind::for_os(Os::Windows), ServiceManagerKind::WindowsService);
  }
}
