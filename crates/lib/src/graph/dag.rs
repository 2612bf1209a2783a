//! Dependency DAG over a recorded manifest.
//!
//! Used to validate a manifest (every edge resolves, no cycles) and to show
//! the order the engine is constrained to: creation waves where every command
//! only depends on earlier waves, and the reverse order for tear-down.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{GraphError, Manifest};

/// A DAG of command names. Edges point from a dependency to its dependent.
pub struct ExecutionDag {
  graph: DiGraph<String, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl ExecutionDag {
  /// Build the DAG for `manifest`.
  ///
  /// # Errors
  ///
  /// `UnknownDependency` if an edge names a command that is not in the
  /// manifest, `CycleDetected` if the edges form a cycle.
  pub fn from_manifest(manifest: &Manifest) -> Result<Self, GraphError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for name in manifest.commands.keys() {
      let idx = graph.add_node(name.clone());
      nodes.insert(name.clone(), idx);
    }

    for (name, command) in &manifest.commands {
      let dependent_idx = nodes[name];
      for dep in &command.depends_on {
        let Some(&dep_idx) = nodes.get(dep) else {
          return Err(GraphError::UnknownDependency {
            name: name.clone(),
            dependency: dep.clone(),
          });
        };
        graph.add_edge(dep_idx, dependent_idx, ());
      }
    }

    let dag = Self { graph, nodes };
    dag.verify_acyclic()?;
    Ok(dag)
  }

  fn verify_acyclic(&self) -> Result<(), GraphError> {
    toposort(&self.graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(())
  }

  /// Command names with every dependency ahead of its dependents.
  pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
    let sorted = toposort(&self.graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  /// Tear-down order: dependents before their dependencies.
  pub fn destroy_order(&self) -> Result<Vec<String>, GraphError> {
    let mut order = self.topological_order()?;
    order.reverse();
    Ok(order)
  }

  /// Group commands into waves. Each wave only depends on earlier waves.
  /// Names within a wave are sorted.
  pub fn waves(&self) -> Result<Vec<Vec<String>>, GraphError> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();

    let mut remaining: BTreeSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();

      if ready.is_empty() {
        return Err(GraphError::CycleDetected);
      }

      for idx in &ready {
        remaining.remove(idx);
        for neighbor in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<String> = ready.into_iter().map(|idx| self.graph[idx].clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    Ok(waves)
  }

  /// Direct dependencies of `name`, sorted.
  pub fn dependencies(&self, name: &str) -> Vec<String> {
    self.neighbors(name, Direction::Incoming)
  }

  /// Direct dependents of `name`, sorted.
  pub fn dependents(&self, name: &str) -> Vec<String> {
    self.neighbors(name, Direction::Outgoing)
  }

  fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
    let Some(&idx) = self.nodes.get(name) else {
      return Vec::new();
    };
    let mut names: Vec<String> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].clone())
      .collect();
    names.sort();
    names.dedup();
    names
  }
}
