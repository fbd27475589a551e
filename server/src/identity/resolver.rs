//! Role resolution for one identity.
//!
//! A pure function of the identity snapshot and the admin allow-list.
//! First match wins:
//!
//! 1. platform superuser
//! 2. allow-list entry (id, account name, or main-character name)
//! 3. corporation CEO
//! 4. corporation leadership title
//! 5. named platform role alias
//! 6. plain member
//!
//! Missing affiliation data skips steps 3 and 4; it is never an error.

use super::{AdminAllowlist, Identity};
use crate::permissions::{PermissionBundle, PermissionScope, Role};

/// Leadership titles that grant the director role, matched
/// case-insensitively. Extend here for additional locales.
const LEADERSHIP_TITLES: &[&str] = &["director", "董事", "leadership", "officer"];

/// Output of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub role: Role,
    pub bundle: PermissionBundle,
    pub scope: PermissionScope,
}

impl Resolution {
    fn from_role(role: Role) -> Self {
        Self {
            role,
            bundle: role.bundle(),
            scope: role.scope(),
        }
    }
}

/// Resolve the permission role for an identity.
pub fn resolve(identity: &Identity, allowlist: &AdminAllowlist) -> Resolution {
    if identity.superuser {
        return Resolution::from_role(Role::Admin);
    }

    if allowlist.matches(identity) {
        return Resolution::from_role(Role::Admin);
    }

    if let Some(main) = &identity.main_character {
        if main.corporation_ceo_id == Some(main.character_id) {
            return Resolution::from_role(Role::CorpCeo);
        }

        let has_leadership_title = main.titles.iter().any(|title| {
            let title = title.trim().to_lowercase();
            LEADERSHIP_TITLES.contains(&title.as_str())
        });
        if has_leadership_title {
            return Resolution::from_role(Role::CorpDirector);
        }
    }

    if let Some(role) = platform_role_alias(&identity.roles) {
        return Resolution::from_role(role);
    }

    Resolution::from_role(Role::Member)
}

/// Map named platform roles onto voice roles. When several aliases are
/// assigned, the strongest wins (admin over moderator over fleet commander).
fn platform_role_alias(roles: &[String]) -> Option<Role> {
    let mut best: Option<Role> = None;
    for role in roles {
        let matched = match role.trim().to_lowercase().as_str() {
            "mumble_admin" | "voice_admin" => Some(Role::SeatAdmin),
            "mumble_moderator" | "voice_moderator" => Some(Role::SeatModerator),
            "fleet_commander" | "fc" => Some(Role::FleetCommander),
            _ => None,
        };
        best = match (best, matched) {
            (None, m) => m,
            (b, None) => b,
            (Some(b), Some(m)) => Some(if rank(m) > rank(b) { m } else { b }),
        };
    }
    best
}

const fn rank(role: Role) -> u8 {
    match role {
        Role::SeatAdmin => 3,
        Role::SeatModerator => 2,
        Role::FleetCommander => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Affiliation;
    use crate::permissions::ChannelPermissions;

    fn member(id: i64, name: &str) -> Identity {
        Identity {
            id,
            name: name.to_string(),
            nickname: None,
            superuser: false,
            roles: Vec::new(),
            main_character: None,
        }
    }

    fn affiliated(id: i64, name: &str, character_id: i64, ceo_id: Option<i64>) -> Identity {
        Identity {
            main_character: Some(Affiliation {
                character_id,
                character_name: format!("{name} Prime"),
                corporation_id: 100,
                corporation_name: Some("Test Corp".to_string()),
                corporation_ticker: Some("TEST".to_string()),
                corporation_ceo_id: ceo_id,
                alliance_id: None,
                titles: Vec::new(),
            }),
            ..member(id, name)
        }
    }

    #[test]
    fn test_superuser_always_admin() {
        let mut identity = affiliated(1, "alice", 9001, Some(9999));
        identity.superuser = true;
        identity.roles = vec!["fleet_commander".to_string()];

        let res = resolve(&identity, &AdminAllowlist::default());
        assert_eq!(res.role, Role::Admin);
        assert_eq!(res.scope, PermissionScope::Global);
        assert_eq!(res.bundle.allow, ChannelPermissions::ROLE_ADMIN);
    }

    #[test]
    fn test_allowlist_grants_admin_and_removal_demotes() {
        let identity = member(42, "alice");
        let mut allowlist = AdminAllowlist::from_comma_list("42");

        assert_eq!(resolve(&identity, &allowlist).role, Role::Admin);

        allowlist.remove("42");
        assert_eq!(resolve(&identity, &allowlist).role, Role::Member);
    }

    #[test]
    fn test_allowlist_matches_main_character_name() {
        let identity = affiliated(7, "bob", 9007, None);
        let allowlist = AdminAllowlist::from_comma_list(" bob Prime ");
        assert_eq!(resolve(&identity, &allowlist).role, Role::Admin);
    }

    #[test]
    fn test_ceo_resolves_to_corp_ceo() {
        let identity = affiliated(7, "bob", 9007, Some(9007));
        let res = resolve(&identity, &AdminAllowlist::default());

        assert_eq!(res.role, Role::CorpCeo);
        assert_eq!(res.scope, PermissionScope::Corporation);
        assert_eq!(res.bundle.allow, ChannelPermissions::ROLE_MODERATOR);
    }

    #[test]
    fn test_director_title_clears_kick() {
        let mut identity = affiliated(8, "carol", 9008, Some(1234));
        identity
            .main_character
            .as_mut()
            .unwrap()
            .titles
            .push("Director".to_string());

        let res = resolve(&identity, &AdminAllowlist::default());
        assert_eq!(res.role, Role::CorpDirector);
        assert_eq!(res.scope, PermissionScope::Corporation);
        assert_eq!(
            res.bundle.allow,
            ChannelPermissions::ROLE_MODERATOR - ChannelPermissions::KICK
        );
    }

    #[test]
    fn test_leadership_titles_are_case_insensitive() {
        for title in ["OFFICER", "Leadership", "董事"] {
            let mut identity = affiliated(8, "carol", 9008, None);
            identity
                .main_character
                .as_mut()
                .unwrap()
                .titles
                .push(title.to_string());
            assert_eq!(
                resolve(&identity, &AdminAllowlist::default()).role,
                Role::CorpDirector,
                "title {title:?} should grant director"
            );
        }
    }

    #[test]
    fn test_ceo_outranks_platform_roles() {
        let mut identity = affiliated(9, "dave", 9009, Some(9009));
        identity.roles = vec!["mumble_admin".to_string()];

        // Precedence is fixed: corporation leadership is checked before
        // named platform roles.
        assert_eq!(
            resolve(&identity, &AdminAllowlist::default()).role,
            Role::CorpCeo
        );
    }

    #[test]
    fn test_platform_role_aliases() {
        for (alias, expected) in [
            ("mumble_admin", Role::SeatAdmin),
            ("voice_admin", Role::SeatAdmin),
            ("mumble_moderator", Role::SeatModerator),
            ("voice_moderator", Role::SeatModerator),
            ("fleet_commander", Role::FleetCommander),
            ("fc", Role::FleetCommander),
        ] {
            let mut identity = member(10, "erin");
            identity.roles = vec![alias.to_string()];
            assert_eq!(
                resolve(&identity, &AdminAllowlist::default()).role,
                expected,
                "alias {alias:?}"
            );
        }
    }

    #[test]
    fn test_strongest_platform_role_wins() {
        let mut identity = member(10, "erin");
        identity.roles = vec!["fc".to_string(), "voice_admin".to_string()];
        assert_eq!(
            resolve(&identity, &AdminAllowlist::default()).role,
            Role::SeatAdmin
        );
    }

    #[test]
    fn test_fleet_commander_scope() {
        let mut identity = member(11, "frank");
        identity.roles = vec!["fc".to_string()];
        let res = resolve(&identity, &AdminAllowlist::default());
        assert_eq!(res.role, Role::FleetCommander);
        assert_eq!(res.scope, PermissionScope::Fleet);
    }

    #[test]
    fn test_missing_affiliation_falls_through_to_member() {
        let identity = member(12, "grace");
        let res = resolve(&identity, &AdminAllowlist::default());
        assert_eq!(res.role, Role::Member);
        assert_eq!(res.scope, PermissionScope::Global);
        assert_eq!(res.bundle.allow, ChannelPermissions::ROLE_USER);
    }

    #[test]
    fn test_failed_ceo_lookup_is_not_a_corp_role() {
        // Provider could not resolve the corporation record: ceo id is None.
        let identity = affiliated(13, "heidi", 9013, None);
        assert_eq!(
            resolve(&identity, &AdminAllowlist::default()).role,
            Role::Member
        );
    }
}
