//! Implementation of the `hostcmd probe` command.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use hostcmd_lib::runner::Phase;

use super::run::execute;
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, print_warning};

/// Run the readiness probe of `target`, reporting whether it is usable.
pub fn cmd_probe(config: &Path, target: &str, timeout: Option<Duration>, format: OutputFormat) -> Result<()> {
  let evaluation = super::evaluate(config)?;
  let runner = evaluation
    .runners
    .get(target)
    .with_context(|| format!("No target named {} in {}", target, config.display()))?;

  let Some(ready) = runner.ready() else {
    if format.is_json() {
      return print_json(&serde_json::json!({ "target": target, "probe": null, "ready": true }));
    }
    print_warning(&format!("{} has no readiness probe", target));
    return Ok(());
  };

  let resource = evaluation
    .manifest
    .get(&ready.name)
    .with_context(|| format!("Probe {} was not recorded", ready.name))?;

  let (_, elapsed) = execute(runner, resource, Phase::Create, timeout)?;

  if format.is_json() {
    return print_json(&serde_json::json!({
      "target": target,
      "probe": resource.create,
      "ready": true,
      "elapsed_ms": elapsed.as_millis() as u64,
    }));
  }

  print_success(&format!("{} is ready", target));
  print_stat("Probe", &resource.create);
  print_stat("Elapsed", &format_duration(elapsed));
  Ok(())
}
