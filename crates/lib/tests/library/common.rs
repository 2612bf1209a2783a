//! Shared helpers for the integration tests.

use std::sync::{Arc, Mutex};

use hostcmd_lib::command::CommandResource;
use hostcmd_lib::graph::{CommandHandle, Manifest, SharedGraph};
use hostcmd_lib::platform::os::Os;
use hostcmd_lib::runner::{Readiness, Runner};

/// A local POSIX runner recording into a fresh manifest.
pub fn local_runner() -> (Arc<Mutex<Manifest>>, Runner) {
  let manifest = Arc::new(Mutex::new(Manifest::default()));
  let graph: SharedGraph = manifest.clone();
  let runner = Runner::local("local", Os::Linux, Readiness::None, graph).unwrap();
  (manifest, runner)
}

/// The recorded resource behind `handle`.
pub fn resource(manifest: &Arc<Mutex<Manifest>>, handle: &CommandHandle) -> CommandResource {
  manifest.lock().unwrap().get(&handle.name).cloned().unwrap()
}
