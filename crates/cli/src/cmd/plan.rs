//! Implementation of the `hostcmd plan` command.
//!
//! Evaluates a host description, prints the resulting commands in creation
//! waves and optionally writes the manifest for the engine. With `--previous`
//! each command is annotated with the change it would cause.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use hostcmd_lib::command::Change;
use hostcmd_lib::graph::{ExecutionDag, Manifest};
use hostcmd_lib::util::hash::Hashable;

use crate::output::{OutputFormat, PlanStatus, print_json, print_plan_line, print_stat, print_success, symbols, truncate_hash};

fn compare(manifest: &Manifest, previous: &Manifest) -> Result<BTreeMap<String, PlanStatus>> {
  let mut statuses = BTreeMap::new();

  for (name, command) in &manifest.commands {
    let status = match previous.get(name) {
      None => PlanStatus::Create,
      Some(prior) => match command
        .change_against(prior)
        .with_context(|| format!("Failed to compare {}", name))?
      {
        Change::None => PlanStatus::Unchanged,
        Change::Update => PlanStatus::Update,
        Change::Replace { delete_first: true } => PlanStatus::ReplaceDeleteFirst,
        Change::Replace { delete_first: false } => PlanStatus::Replace,
      },
    };
    statuses.insert(name.clone(), status);
  }

  for name in previous.commands.keys() {
    if !manifest.commands.contains_key(name) {
      statuses.insert(name.clone(), PlanStatus::Destroy);
    }
  }

  Ok(statuses)
}

pub fn cmd_plan(config: &Path, out: Option<&Path>, previous: Option<&Path>, format: OutputFormat) -> Result<()> {
  let evaluation = super::evaluate(config)?;
  let manifest = evaluation.manifest;

  let dag = ExecutionDag::from_manifest(&manifest).context("Invalid command graph")?;
  let waves = dag.waves().context("Failed to order commands")?;
  let hash = manifest.compute_hash().context("Failed to compute manifest hash")?;

  let statuses = match previous {
    Some(path) => {
      let prior = Manifest::load(path).with_context(|| format!("Failed to load previous manifest: {}", path.display()))?;
      Some(compare(&manifest, &prior)?)
    }
    None => None,
  };

  if let Some(path) = out {
    manifest
      .save(path)
      .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
  }

  if format.is_json() {
    let json = serde_json::json!({
      "hash": hash.0,
      "commands": manifest.len(),
      "waves": waves,
      "changes": statuses,
      "stacks": evaluation
        .stacks
        .iter()
        .map(|s| serde_json::json!({ "name": s.name, "project": s.project, "files": s.files }))
        .collect::<Vec<_>>(),
    });
    return print_json(&json);
  }

  print_success(&format!("Plan: {}", truncate_hash(&hash.0)));
  print_stat("Targets", &evaluation.runners.len().to_string());
  print_stat("Commands", &manifest.len().to_string());

  for (i, wave) in waves.iter().enumerate() {
    println!();
    println!("Wave {}:", i + 1);
    for name in wave {
      print_plan_line(statuses.as_ref().and_then(|s| s.get(name).copied()), name);
    }
  }

  if let Some(statuses) = &statuses {
    let destroyed: Vec<&String> = statuses
      .iter()
      .filter(|(_, s)| **s == PlanStatus::Destroy)
      .map(|(n, _)| n)
      .collect();
    if !destroyed.is_empty() {
      println!();
      println!("Removed:");
      for name in destroyed {
        print_plan_line(Some(PlanStatus::Destroy), name);
      }
    }

    let count = |status: PlanStatus| statuses.values().filter(|s| **s == status).count();
    println!();
    print_stat("To create", &count(PlanStatus::Create).to_string());
    print_stat("To update", &count(PlanStatus::Update).to_string());
    print_stat(
      "To replace",
      &(count(PlanStatus::Replace) + count(PlanStatus::ReplaceDeleteFirst)).to_string(),
    );
    print_stat("To destroy", &count(PlanStatus::Destroy).to_string());
    print_stat("Unchanged", &count(PlanStatus::Unchanged).to_string());
  }

  for stack in &evaluation.stacks {
    println!();
    println!("Compose stack {} (project {}):", stack.name, stack.project);
    for file in &stack.files {
      println!("  {} {}", symbols::ARROW, file);
    }
  }

  if let Some(path) = out {
    println!();
    print_stat("Manifest", &path.display().to_string());
  }

  Ok(())
}
