//! Remote execution through the OpenSSH client.

use tokio::process::Command;

use super::{TransportConfig, TransportError};
use crate::runner::Connection;

/// Arguments for running `script` on `conn`.
///
/// Batch mode makes authentication failures fail fast instead of prompting.
pub fn ssh_args(conn: &Connection, script: &str, config: &TransportConfig) -> Result<Vec<String>, TransportError> {
  if conn.private_key_passphrase.is_some() {
    return Err(TransportError::PassphraseUnsupported {
      host: conn.host.clone(),
    });
  }

  let mut args = vec![
    "-o".to_string(),
    "BatchMode=yes".to_string(),
    "-o".to_string(),
    "StrictHostKeyChecking=accept-new".to_string(),
    "-o".to_string(),
    format!("ConnectTimeout={}", config.connect_timeout_secs),
    "-p".to_string(),
    conn.port.to_string(),
  ];

  if let Some(key) = &conn.private_key_path {
    args.push("-i".to_string());
    args.push(key.display().to_string());
  }

  args.push(conn.destination());
  args.push("--".to_string());
  args.push(script.to_string());
  Ok(args)
}

/// Build the ssh process for `script`.
pub fn ssh_command(conn: &Connection, script: &str, config: &TransportConfig) -> Result<Command, TransportError> {
  let mut command = Command::new(&config.ssh_binary);
  command.args(ssh_args(conn, script, config)?);
  Ok(command)
}
