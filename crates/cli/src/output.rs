//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, durations, and how plan changes are rendered.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const REPLACE: &str = "±";
  pub const REMOVE: &str = "-";
}

/// How one command compares to an earlier plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
  Create,
  Update,
  Replace,
  ReplaceDeleteFirst,
  Unchanged,
  Destroy,
}

impl PlanStatus {
  pub fn symbol(self) -> &'static str {
    match self {
      PlanStatus::Create => symbols::ADD,
      PlanStatus::Update => symbols::MODIFY,
      PlanStatus::Replace | PlanStatus::ReplaceDeleteFirst => symbols::REPLACE,
      PlanStatus::Unchanged => " ",
      PlanStatus::Destroy => symbols::REMOVE,
    }
  }

  /// Trailing note for statuses the symbol alone does not tell apart.
  pub fn note(self) -> Option<&'static str> {
    match self {
      PlanStatus::ReplaceDeleteFirst => Some("(delete first)"),
      _ => None,
    }
  }
}

/// Print one plan line; `None` means there was nothing to compare against.
pub fn print_plan_line(status: Option<PlanStatus>, name: &str) {
  let Some(status) = status else {
    println!("  {} {}", symbols::INFO, name);
    return;
  };
  let symbol = status.symbol();
  let styled = match status {
    PlanStatus::Create => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    PlanStatus::Update => symbol.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    PlanStatus::Replace | PlanStatus::ReplaceDeleteFirst => {
      symbol.if_supports_color(Stream::Stdout, |s| s.magenta()).to_string()
    }
    PlanStatus::Unchanged => symbol.to_string(),
    PlanStatus::Destroy => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
  };
  match status.note() {
    Some(note) => println!(
      "  {} {} {}",
      styled,
      name,
      note.if_supports_color(Stream::Stdout, |s| s.dimmed())
    ),
    None => println!("  {} {}", styled, name),
  }
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
