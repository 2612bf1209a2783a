//! Command descriptors.
//!
//! A [`CommandArgs`] is what callers describe: create/update/delete actions,
//! triggers, environment, stdin and execution flags. Resolving it against an
//! OS family produces the literal text that ends up in a
//! [`CommandResource`], the unit registered with the resource graph.

mod types;

pub use types::{Change, CommandArgs, CommandResource, ResolveError, ResolvedActions, ResourceOptions};
