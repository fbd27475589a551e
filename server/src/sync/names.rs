//! Display-name reconciliation.

use crate::identity::Identity;

/// The name an identity should carry on the voice server.
///
/// Separate from the registration name: the registration name is the stable
/// login handle chosen at link time, the display name follows the nickname
/// and main character and may change between passes.
#[must_use]
pub fn desired_display_name(identity: &Identity) -> String {
    identity.display_name().to_string()
}
