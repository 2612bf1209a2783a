//! Command descriptor types and resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::CommandHandle;
use crate::platform::os::Os;
use crate::runner::TargetDef;
use crate::util::hash::{HashError, Hashable, ObjectHash};

/// Configuration errors raised while resolving a descriptor.
///
/// These are never retried: the same inputs always fail the same way.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  #[error("{os} targets do not support {requested}")]
  UnsupportedElevation { os: &'static str, requested: String },

  #[error("command {name} is missing required field: {field}")]
  MissingField { name: String, field: &'static str },

  #[error("invalid environment variable name: {0:?}")]
  InvalidEnvName(String),

  #[error("invalid user name: {0:?}")]
  InvalidUser(String),

  #[error("command {name} reads a sudo password from stdin but target {target} has no password configured")]
  MissingSudoPassword { name: String, target: String },

  #[error("failed to fingerprint command {name}: {source}")]
  Fingerprint {
    name: String,
    #[source]
    source: HashError,
  },
}

/// An abstract command, before OS-specific resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
  /// Run when the resource is created.
  pub create: Option<String>,
  /// Run when the resource changes in place. Falls back to `create` when absent.
  pub update: Option<String>,
  /// Reverses `create`. Absent means nothing to clean up.
  pub delete: Option<String>,
  /// Values whose combined fingerprint forces a replacement when it changes.
  pub triggers: Vec<String>,
  pub environment: BTreeMap<String, String>,
  pub elevate: bool,
  /// Have `sudo` read the password from the first line of stdin.
  pub require_password_from_stdin: bool,
  pub run_as_user: Option<String>,
  pub stdin: Option<String>,
}

impl CommandArgs {
  /// A command with only a create action.
  pub fn create(action: impl Into<String>) -> Self {
    Self {
      create: Some(action.into()),
      ..Default::default()
    }
  }

  pub fn with_delete(mut self, action: impl Into<String>) -> Self {
    self.delete = Some(action.into());
    self
  }

  pub fn with_update(mut self, action: impl Into<String>) -> Self {
    self.update = Some(action.into());
    self
  }

  pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.environment.insert(name.into(), value.into());
    self
  }

  pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
    self.triggers.push(trigger.into());
    self
  }

  pub fn elevated(mut self) -> Self {
    self.elevate = true;
    self
  }

  pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
    self.stdin = Some(stdin.into());
    self
  }

  /// Whether the transport must feed a sudo password ahead of stdin.
  pub fn needs_password(&self) -> bool {
    let sudo = self.elevate || self.run_as_user.as_deref().is_some_and(|u| !u.is_empty());
    self.require_password_from_stdin && sudo
  }

  /// Resolve every action against `os`.
  ///
  /// Output is deterministic: resolving the same args for the same OS twice
  /// yields byte-identical text.
  pub fn resolve(&self, name: &str, os: Os) -> Result<ResolvedActions, ResolveError> {
    let Some(create) = self.create.as_deref() else {
      return Err(ResolveError::MissingField {
        name: name.to_string(),
        field: "create",
      });
    };

    let builder = os.command_builder();
    let run_as = self.run_as_user.as_deref();
    let build = |action: &str| {
      builder.build_command_line(
        action,
        &self.environment,
        self.elevate,
        self.require_password_from_stdin,
        run_as,
      )
    };

    Ok(ResolvedActions {
      create: build(create)?,
      update: self.update.as_deref().map(build).transpose()?,
      delete: self.delete.as_deref().map(build).transpose()?,
    })
  }
}

/// The OS-specific text of each action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActions {
  pub create: String,
  pub update: Option<String>,
  pub delete: Option<String>,
}

/// Options the resource graph honors alongside a descriptor.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
  pub depends_on: Vec<CommandHandle>,
  /// Any change replaces the resource instead of running the update action.
  pub replace_on_changes: bool,
  /// When replacing, run the old delete action before the new create action.
  pub delete_before_replace: bool,
}

impl ResourceOptions {
  pub fn depends_on(handles: impl IntoIterator<Item = CommandHandle>) -> Self {
    Self {
      depends_on: handles.into_iter().collect(),
      ..Default::default()
    }
  }

  /// Force replacement, deleting the old resource first.
  pub fn replace(mut self) -> Self {
    self.replace_on_changes = true;
    self.delete_before_replace = true;
    self
  }
}

/// A resolved command as registered with the resource graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResource {
  pub name: String,
  pub runner: String,
  pub target: TargetDef,
  pub os: Os,
  pub create: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub update: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delete: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stdin: Option<String>,
  /// The transport prepends the target's sudo password to stdin.
  #[serde(default)]
  pub password_on_stdin: bool,
  #[serde(default)]
  pub triggers: Vec<String>,
  #[serde(default)]
  pub depends_on: Vec<String>,
  #[serde(default)]
  pub replace_on_changes: bool,
  #[serde(default)]
  pub delete_before_replace: bool,
}

impl Hashable for CommandResource {}

/// How a resource changed relative to its previously registered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Change {
  /// Nothing to run.
  None,
  /// Run the update action, or the create action again when there is none.
  Update,
  /// Tear down and recreate.
  Replace { delete_first: bool },
}

#[derive(Serialize)]
struct TriggerSet<'a>(&'a [String]);

impl Hashable for TriggerSet<'_> {}

impl CommandResource {
  /// Fingerprint over every field; dependents use it as a trigger.
  pub fn fingerprint(&self) -> Result<ObjectHash, ResolveError> {
    self.compute_hash().map_err(|source| ResolveError::Fingerprint {
      name: self.name.clone(),
      source,
    })
  }

  /// Combined fingerprint of the triggers only.
  pub fn trigger_fingerprint(&self) -> Result<ObjectHash, ResolveError> {
    TriggerSet(&self.triggers)
      .compute_hash()
      .map_err(|source| ResolveError::Fingerprint {
        name: self.name.clone(),
        source,
      })
  }

  /// Classify the change from `prior` to `self`.
  ///
  /// A changed trigger set, target or OS replaces the resource. Otherwise a
  /// change in any action text or stdin updates it in place, unless
  /// `replace_on_changes` is set.
  pub fn change_against(&self, prior: &CommandResource) -> Result<Change, ResolveError> {
    let replace = Change::Replace {
      delete_first: self.delete_before_replace,
    };

    if self.trigger_fingerprint()? != prior.trigger_fingerprint()? || self.target != prior.target || self.os != prior.os
    {
      return Ok(replace);
    }

    let text_changed = self.create != prior.create
      || self.update != prior.update
      || self.delete != prior.delete
      || self.stdin != prior.stdin
      || self.password_on_stdin != prior.password_on_stdin;

    Ok(match (text_changed, self.replace_on_changes) {
      (false, _) => Change::None,
      (true, true) => replace,
      (true, false) => Change::Update,
    })
  }
}
