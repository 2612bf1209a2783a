//! Implementation of the `hostcmd run` command.
//!
//! Runs a single action of a single command from an evaluated host
//! description. Dependencies are not run first; ordering belongs to the
//! engine.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use hostcmd_lib::command::CommandResource;
use hostcmd_lib::runner::{Phase, Runner};
use hostcmd_lib::transport::{CommandOutput, TransportConfig};

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, print_warning};

/// Execute `phase` of `resource` on `runner`, bounded by `timeout`.
pub(super) fn execute(
  runner: &Runner,
  resource: &CommandResource,
  phase: Phase,
  timeout: Option<Duration>,
) -> Result<(Option<CommandOutput>, Duration)> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let config = TransportConfig::default();
  let start = Instant::now();

  let output = rt.block_on(async {
    let run = runner.execute(resource, phase, &config);
    let result = match timeout {
      Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
        anyhow!(
          "{} timed out after {}",
          resource.name,
          humantime::format_duration(limit)
        )
      })?,
      None => run.await,
    };
    result.with_context(|| format!("Command {} failed", resource.name))
  })?;

  Ok((output, start.elapsed()))
}

pub fn cmd_run(
  config: &Path,
  name: &str,
  phase: Phase,
  timeout: Option<Duration>,
  dry_run: bool,
  format: OutputFormat,
) -> Result<()> {
  let evaluation = super::evaluate(config)?;
  let resource = evaluation
    .manifest
    .get(name)
    .with_context(|| format!("No command named {} in {}", name, config.display()))?;
  let runner = evaluation
    .runners
    .get(&resource.runner)
    .with_context(|| format!("No runner named {}", resource.runner))?;

  if dry_run {
    let script = match phase {
      Phase::Create => Some(resource.create.as_str()),
      Phase::Update => Some(resource.update.as_deref().unwrap_or(&resource.create)),
      Phase::Delete => resource.delete.as_deref(),
    };
    match script {
      Some(script) => println!("{}", script),
      None => print_warning(&format!("{} has no delete action", name)),
    }
    return Ok(());
  }

  info!(name = %name, target = %runner.target(), "running command");
  let (output, elapsed) = execute(runner, resource, phase, timeout)?;

  if format.is_json() {
    let json = serde_json::json!({
      "name": name,
      "phase": phase,
      "ran": output.is_some(),
      "stdout": output.as_ref().map(|o| o.stdout.as_str()),
      "stderr": output.as_ref().map(|o| o.stderr.as_str()),
      "elapsed_ms": elapsed.as_millis() as u64,
    });
    return print_json(&json);
  }

  match output {
    Some(output) => {
      if !output.stdout.is_empty() {
        println!("{}", output.stdout);
      }
      print_success(&format!("{} {:?} finished", name, phase));
      print_stat("Elapsed", &format_duration(elapsed));
    }
    None => print_warning(&format!("{} has no delete action; nothing to run", name)),
  }

  Ok(())
}
