mod info;
mod plan;
mod probe;
mod run;

use std::path::Path;

use anyhow::{Context, Result};

use hostcmd_lib::config::{Evaluation, HostConfig};

pub use info::cmd_info;
pub use plan::cmd_plan;
pub use probe::cmd_probe;
pub use run::cmd_run;

/// Load and evaluate a host description.
fn evaluate(path: &Path) -> Result<Evaluation> {
  let path =
    dunce::canonicalize(path).with_context(|| format!("Failed to load host description: {}", path.display()))?;
  let path = path.as_path();
  let config = HostConfig::load(path).with_context(|| format!("Failed to load host description: {}", path.display()))?;
  config
    .evaluate()
    .with_context(|| format!("Failed to evaluate host description: {}", path.display()))
}
