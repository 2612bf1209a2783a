//! Execution targets.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SSH_PORT;

fn default_port() -> u16 {
  DEFAULT_SSH_PORT
}

/// Credentials for a remote host. Immutable once handed to a runner.
///
/// Secrets are never serialized, and `Debug` redacts them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  pub user: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub private_key_path: Option<PathBuf>,
  #[serde(default, skip_serializing)]
  pub private_key_passphrase: Option<String>,
  /// Fed to `sudo -S` for commands that read the password from stdin.
  #[serde(default, skip_serializing)]
  pub sudo_password: Option<String>,
}

impl Connection {
  pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
    Self {
      host: host.into(),
      port: DEFAULT_SSH_PORT,
      user: user.into(),
      private_key_path: None,
      private_key_passphrase: None,
      sudo_password: None,
    }
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = port;
    self
  }

  pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
    self.private_key_path = Some(path.into());
    self
  }

  pub fn with_sudo_password(mut self, password: impl Into<String>) -> Self {
    self.sudo_password = Some(password.into());
    self
  }

  /// `user@host`
  pub fn destination(&self) -> String {
    format!("{}@{}", self.user, self.host)
  }
}

impl fmt::Debug for Connection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
    f.debug_struct("Connection")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("private_key_path", &self.private_key_path)
      .field("private_key_passphrase", &redact(&self.private_key_passphrase))
      .field("sudo_password", &redact(&self.sudo_password))
      .finish()
  }
}

/// Where a runner's commands execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Local,
  Remote(Connection),
}

impl Target {
  pub fn sudo_password(&self) -> Option<&str> {
    match self {
      Self::Local => None,
      Self::Remote(conn) => conn.sudo_password.as_deref(),
    }
  }

  /// The secret-free description recorded in the manifest.
  pub fn def(&self) -> TargetDef {
    match self {
      Self::Local => TargetDef::Local,
      Self::Remote(conn) => TargetDef::Remote {
        host: conn.host.clone(),
        port: conn.port,
        user: conn.user.clone(),
        private_key_path: conn.private_key_path.clone(),
      },
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Local => write!(f, "local"),
      Self::Remote(conn) => write!(f, "{}:{}", conn.destination(), conn.port),
    }
  }
}

/// Serializable description of a target, without secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetDef {
  Local,
  Remote {
    host: String,
    port: u16,
    user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key_path: Option<PathBuf>,
  },
}
