//! Integration tests for hostcmd-lib.

mod common;
mod graph_tests;
#[cfg(unix)]
mod lifecycle_tests;
