mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hostcmd_lib::runner::Phase;

use crate::cmd::{cmd_info, cmd_plan, cmd_probe, cmd_run};
use crate::output::OutputFormat;

/// hostcmd - idempotent commands and resource lifecycles for test hosts
#[derive(Parser)]
#[command(name = "hostcmd")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a host description and show the resulting commands
  Plan {
    /// Path to the host description
    #[arg(default_value = "hosts.yaml")]
    config: PathBuf,

    /// Write the manifest to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Compare against a manifest written by an earlier plan
    #[arg(long)]
    previous: Option<PathBuf>,
  },

  /// Run one action of one command
  Run {
    /// Path to the host description
    config: PathBuf,

    /// Full command name, e.g. web-write-/etc/app.conf
    name: String,

    /// Which action to run
    #[arg(long, default_value = "create")]
    phase: Phase,

    /// Give up after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Print the script instead of running it
    #[arg(long)]
    dry_run: bool,
  },

  /// Run a target's readiness probe
  Probe {
    /// Path to the host description
    config: PathBuf,

    /// Target name
    target: String,

    /// Give up after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
  },

  /// Show information about the local system
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Plan { config, out, previous } => cmd_plan(&config, out.as_deref(), previous.as_deref(), cli.output),
    Commands::Run {
      config,
      name,
      phase,
      timeout,
      dry_run,
    } => cmd_run(&config, &name, phase, timeout, dry_run, cli.output),
    Commands::Probe {
      config,
      target,
      timeout,
    } => cmd_probe(&config, &target, timeout, cli.output),
    Commands::Info => cmd_info(cli.output),
  }
}
