//! hostcmd-lib: idempotent command execution and resource lifecycles for test hosts
//!
//! This crate turns "run this on a machine, and undo it on teardown" into
//! resolved, OS-specific command resources for an external resource graph:
//! - `CommandArgs` / `CommandResource`: the command descriptor before and after resolution
//! - `Runner`: binds descriptors to a local or remote target behind a readiness probe
//! - `PackageManager`, `ServiceManager`, `DockerManager`: higher-level primitives
//! - `Manifest`: the recorded graph handed to the engine

pub mod command;
pub mod config;
pub mod consts;
pub mod docker;
pub mod graph;
pub mod oscmd;
pub mod pkg;
pub mod platform;
pub mod runner;
pub mod service;
pub mod transport;
pub mod util;
