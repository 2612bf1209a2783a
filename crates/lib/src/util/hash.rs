//! Hashing utilities for fingerprints and change triggers.
//!
//! This module provides:
//! - `ObjectHash`: A truncated 20-character hash identifying a resolved resource
//! - `ContentHash`: A full 64-character hash of arbitrary bytes
//! - `hash_bytes()`: Arbitrary byte hashing

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::{NAME_HASH_LEN, OBJ_HASH_PREFIX_LEN};

pub type HashError = serde_json::Error;

/// A content-addressed hash identifying a unique object.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized struct.
/// The external engine compares these to decide whether a resource changed, so
/// the serialized form of anything implementing [`Hashable`] must be stable.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string, e.g., `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl ObjectHash {
  /// Short prefix suitable for embedding in resource names and paths.
  pub fn short(&self) -> &str {
    let len = self.0.len().min(NAME_HASH_LEN);
    &self.0[..len]
  }
}

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = hex::encode(hasher.finalize());
    Ok(ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

/// A full 64-character SHA256 hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Short prefix suitable for embedding in resource names and paths.
  pub fn short(&self) -> &str {
    &self.0[..NAME_HASH_LEN]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  #[derive(Serialize)]
  struct Sample {
    name: String,
    env: BTreeMap<String, String>,
  }

  impl Hashable for Sample {}

  fn sample(value: &str) -> Sample {
    let mut env = BTreeMap::new();
    env.insert("B".to_string(), "2".to_string());
    env.insert("A".to_string(), value.to_string());
    Sample {
      name: "sample".to_string(),
      env,
    }
  }

  #[test]
  fn hash_is_deterministic() {
    let hash1 = sample("1").compute_hash().unwrap();
    let hash2 = sample("1").compute_hash().unwrap();
    assert_eq!(hash1, hash2);
    assert_eq!(hash1.0.len(), OBJ_HASH_PREFIX_LEN);
  }

  #[test]
  fn hash_changes_with_content() {
    let hash1 = sample("1").compute_hash().unwrap();
    let hash2 = sample("2").compute_hash().unwrap();
    assert_ne!(hash1, hash2);
  }

  #[test]
  fn short_prefix_is_name_sized() {
    let hash = sample("1").compute_hash().unwrap();
    assert_eq!(hash.short().len(), NAME_HASH_LEN);
    assert!(hash.0.starts_with(hash.short()));
  }

  #[test]
  fn hash_bytes_works() {
    let hash = hash_bytes(b"hello world");
    assert_eq!(hash.0.len(), 64);
    assert_eq!(
      hash.0,
      "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
  }
}
