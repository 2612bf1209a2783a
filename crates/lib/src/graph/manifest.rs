//! The recorded set of commands handed to the engine.
//!
//! The manifest captures every registered [`CommandResource`] keyed by its
//! unique name. It is fully serializable, so it can be:
//! - written out for the engine to consume,
//! - reloaded to compare against a later evaluation,
//! - hashed for quick equality checks.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CommandHandle, GraphError, ResourceGraph};
use crate::command::CommandResource;
use crate::util::hash::Hashable;

/// All commands registered for one deployment.
///
/// Uses [`BTreeMap`] to ensure deterministic serialization order, which is
/// important for reproducible manifest hashes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  pub commands: BTreeMap<String, CommandResource>,
}

impl Hashable for Manifest {}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),
}

impl Manifest {
  pub fn get(&self, name: &str) -> Option<&CommandResource> {
    self.commands.get(name)
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  /// Names of the commands that directly depend on `name`.
  pub fn dependents_of(&self, name: &str) -> Vec<&str> {
    self
      .commands
      .values()
      .filter(|c| c.depends_on.iter().any(|d| d == name))
      .map(|c| c.name.as_str())
      .collect()
  }

  /// Load a manifest previously written by [`Manifest::save`].
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.display().to_string(),
      source,
    })?;
    serde_json::from_str(&content).map_err(ManifestError::Parse)
  }

  /// Write the manifest as pretty JSON, atomically.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let write_err = |source| ManifestError::Write {
      path: path.display().to_string(),
      source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(self).map_err(ManifestError::Serialize)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;

    info!(path = %path.display(), commands = self.len(), "manifest saved");
    Ok(())
  }
}

impl ResourceGraph for Manifest {
  fn register(&mut self, resource: CommandResource) -> Result<CommandHandle, GraphError> {
    if self.commands.contains_key(&resource.name) {
      return Err(GraphError::DuplicateName(resource.name));
    }

    if let Some(missing) = resource.depends_on.iter().find(|d| !self.commands.contains_key(*d)) {
      return Err(GraphError::UnknownDependency {
        name: resource.name.clone(),
        dependency: missing.clone(),
      });
    }

    let handle = CommandHandle {
      name: resource.name.clone(),
      fingerprint: resource.fingerprint()?,
    };

    debug!(name = %handle.name, fingerprint = %handle.fingerprint, deps = ?resource.depends_on, "recorded command");
    self.commands.insert(resource.name.clone(), resource);
    Ok(handle)
  }
}
