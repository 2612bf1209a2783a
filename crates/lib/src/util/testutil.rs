//! Test utilities for hostcmd-lib.
//!
//! Helpers for tests that need a resource graph or need to execute generated
//! shell text on the local machine.

use std::sync::{Arc, Mutex};

use crate::graph::{Manifest, SharedGraph};

/// Create a fresh recording graph, returning both the concrete handle (for
/// assertions) and the shared trait-object form runners consume.
pub fn recording_graph() -> (Arc<Mutex<Manifest>>, SharedGraph) {
  let manifest = Arc::new(Mutex::new(Manifest::default()));
  let shared: SharedGraph = manifest.clone();
  (manifest, shared)
}

/// Run a generated POSIX command line through `bash -c`, feeding `stdin`.
///
/// Returns `(exit_code, stdout)`.
#[cfg(unix)]
pub fn run_posix(script: &str, stdin: Option<&str>) -> (i32, String) {
  use std::io::Write;
  use std::process::{Command, Stdio};

  let mut child = Command::new("bash")
    .arg("-c")
    .arg(script)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .expect("failed to spawn bash");

  {
    let mut pipe = child.stdin.take().expect("stdin should be piped");
    if let Some(input) = stdin {
      pipe.write_all(input.as_bytes()).expect("failed to write stdin");
    }
  }

  let output = child.wait_with_output().expect("failed to wait for bash");
  (
    output.status.code().unwrap_or(-1),
    String::from_utf8_lossy(&output.stdout).trim().to_string(),
  )
}
