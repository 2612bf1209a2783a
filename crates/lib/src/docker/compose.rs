//! Compose manifest sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{DockerConfig, DockerError};
use crate::command::{CommandArgs, ResourceOptions};
use crate::graph::CommandHandle;
use crate::platform::arch::Arch;
use crate::runner::Runner;
use crate::util::hash::Hashable;
use crate::util::shell::single_quote;

const PLUGIN_DIR: &str = "/usr/local/lib/docker/cli-plugins";
const PROJECT_ENV: &str = "COMPOSE_PROJECT_NAME";

/// One compose file of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeManifest {
  pub name: String,
  pub content: String,
}

impl ComposeManifest {
  pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      content: content.into(),
    }
  }
}

/// A compose stack that was brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeStack {
  pub name: String,
  /// Compose project name, which prefixes the stack's container names.
  pub project: String,
  /// Target-side directory holding the manifests.
  pub directory: String,
  /// Target-side manifest paths, in `-f` order.
  pub files: Vec<String>,
  pub handle: CommandHandle,
}

#[derive(Serialize)]
struct StackFingerprint<'a> {
  manifests: &'a [ComposeManifest],
  env: &'a BTreeMap<String, String>,
}

impl Hashable for StackFingerprint<'_> {}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub(super) fn validate(name: &str, manifests: &[ComposeManifest]) -> Result<(), DockerError> {
  if !is_valid_name(name) {
    return Err(DockerError::InvalidName(name.to_string()));
  }
  if manifests.is_empty() {
    return Err(DockerError::EmptyManifestSet(name.to_string()));
  }

  let mut seen = BTreeSet::new();
  for manifest in manifests {
    if !is_valid_name(&manifest.name) {
      return Err(DockerError::InvalidName(manifest.name.clone()));
    }
    if !seen.insert(manifest.name.as_str()) {
      return Err(DockerError::DuplicateManifest {
        stack: name.to_string(),
        manifest: manifest.name.clone(),
      });
    }
  }
  Ok(())
}

/// Script that installs the compose plugin unless the pinned version is present.
pub(super) fn install_plugin_action(version: &str, arch: Arch) -> String {
  let plugin = format!("{}/docker-compose", PLUGIN_DIR);
  let url = format!(
    "https://github.com/docker/compose/releases/download/{}/docker-compose-linux-{}",
    version,
    arch.as_str()
  );
  let script = format!(
    "docker compose version 2>/dev/null | grep -q {v} || (mkdir -p {dir} && curl --retry 10 -fsSLo {plugin} {url} && chmod 755 {plugin})",
    v = version,
    dir = PLUGIN_DIR,
    plugin = plugin,
    url = url
  );
  format!("bash -c {}", single_quote(&script))
}

pub(super) fn up(
  runner: &Runner,
  config: &DockerConfig,
  plugin: CommandHandle,
  name: &str,
  manifests: &[ComposeManifest],
  env: &BTreeMap<String, String>,
) -> Result<ComposeStack, DockerError> {
  let os = runner.os_command();

  let mut env = env.clone();
  let project = env
    .entry(PROJECT_ENV.to_string())
    .or_insert_with(|| name.to_string())
    .clone();

  let hash = StackFingerprint {
    manifests,
    env: &env,
  }
  .compute_hash()
  .map_err(|source| DockerError::Fingerprint {
    stack: name.to_string(),
    source,
  })?;

  let directory = os.join_path(os.temporary_directory(), &format!("compose-{}-{}", name, hash.short()));
  let dir = runner.create_directory(&directory, false, ResourceOptions::default())?;

  let mut deps = vec![plugin];
  let mut files = Vec::with_capacity(manifests.len());
  for manifest in manifests {
    let path = os.join_path(&directory, &format!("docker-compose-{}.yml", manifest.name));
    let write = runner.write_file(&path, &manifest.content, false, ResourceOptions::depends_on([dir.clone()]))?;
    deps.push(write);
    files.push(path);
  }

  let file_args: Vec<String> = files.iter().map(|f| format!("-f {}", f)).collect();
  let file_args = file_args.join(" ");
  let mut args = CommandArgs::create(format!(
    "docker compose {} up --detach --wait --timeout {}",
    file_args, config.timeout_secs
  ))
  .with_delete(format!("docker compose {} down -t {}", file_args, config.timeout_secs))
  .with_trigger(hash.0.clone());
  args.environment = env;
  args.elevate = config.elevate_compose;

  let handle = runner.command(
    &format!("compose-{}", name),
    args,
    ResourceOptions::depends_on(deps).replace(),
  )?;

  info!(stack = %name, project = %project, files = files.len(), hash = %hash, "compose stack registered");

  Ok(ComposeStack {
    name: name.to_string(),
    project,
    directory,
    files,
    handle,
  })
}
