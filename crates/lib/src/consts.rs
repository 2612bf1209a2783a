//! Constants shared across the crate.

/// Number of hex characters kept from a SHA-256 digest for an `ObjectHash`.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Number of hex characters used when a hash is embedded in a resource name.
pub const NAME_HASH_LEN: usize = 8;

/// Suffix appended to a managed file's path to hold the pre-existing copy.
pub const BACKUP_SUFFIX: &str = "backup";

/// Default `--timeout`/`-t` value (seconds) passed to compose up/down.
pub const DEFAULT_COMPOSE_TIMEOUT_SECS: u32 = 300;

/// Pinned docker compose plugin release.
pub const DEFAULT_COMPOSE_VERSION: &str = "v2.29.1";

/// Environment variable that overrides the ssh client binary.
pub const SSH_BINARY_ENV: &str = "HOSTCMD_SSH";

/// Default ssh port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Suffix of the sibling file new content is staged in before it replaces a managed file.
pub const STAGING_SUFFIX: &str = "hostcmd-new";
