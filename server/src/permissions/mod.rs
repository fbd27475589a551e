//! Permission model shared by the resolver and the sync engine.
//!
//! Bitmask capabilities, allow/deny bundles, and the derived role tiers.

mod bundle;
mod role;

pub use bundle::{ChannelPermissions, PermissionBundle, PermissionScope};
pub use role::{Role, RoleClass};
