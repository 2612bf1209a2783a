//! Boundary with the declarative resource graph engine.
//!
//! Runners submit resolved [`CommandResource`]s through the [`ResourceGraph`]
//! trait and get back opaque [`CommandHandle`]s to use as dependency targets.
//! Scheduling, diffing and execution belong to the engine; [`Manifest`] is
//! the recording implementation whose JSON form is handed to it.

mod dag;
mod manifest;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::command::CommandResource;
use crate::util::hash::ObjectHash;

pub use dag::ExecutionDag;
pub use manifest::{Manifest, ManifestError};

/// Opaque reference to a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandHandle {
  pub name: String,
  pub fingerprint: ObjectHash,
}

impl CommandHandle {
  /// `name:fingerprint`, used when a handle feeds another command's triggers.
  pub fn trigger(&self) -> String {
    format!("{}:{}", self.name, self.fingerprint)
  }
}

impl std::fmt::Display for CommandHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
  #[error("command name already registered: {0}")]
  DuplicateName(String),

  #[error("command {name} depends on unregistered command {dependency}")]
  UnknownDependency { name: String, dependency: String },

  #[error("dependency cycle detected")]
  CycleDetected,

  #[error("resource graph lock poisoned")]
  Poisoned,

  #[error(transparent)]
  Resolve(#[from] crate::command::ResolveError),
}

/// Where resolved commands are submitted.
pub trait ResourceGraph {
  /// Record `resource`, returning a handle dependents can refer to.
  fn register(&mut self, resource: CommandResource) -> Result<CommandHandle, GraphError>;
}

/// The graph shared by every runner and manager of one deployment.
pub type SharedGraph = Arc<Mutex<dyn ResourceGraph + Send>>;

/// Register `resource` on a shared graph.
pub(crate) fn register(graph: &SharedGraph, resource: CommandResource) -> Result<CommandHandle, GraphError> {
  let mut guard = graph.lock().map_err(|_| GraphError::Poisoned)?;
  guard.register(resource)
}
