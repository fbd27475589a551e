//! Integration tests for the permission synchronization engine.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use helpers::{linked_member, with_affiliation, MemoryAccounts, RecordingGateway, StubProvider};
use mb_server::identity::AdminAllowlist;
use mb_server::permissions::{ChannelPermissions, Role};
use mb_server::sync::{SyncEngine, SyncMode, SyncOutcome};

fn engine(
    gateway: Arc<RecordingGateway>,
    provider: StubProvider,
    accounts: Arc<MemoryAccounts>,
    auto_create_channels: bool,
) -> SyncEngine {
    SyncEngine::new(gateway, Arc::new(provider), accounts, auto_create_channels)
}

// ============================================================================
// Batch behaviour
// ============================================================================

#[tokio::test]
async fn test_one_failure_does_not_abort_the_pass() {
    let gateway = Arc::new(
        RecordingGateway::new()
            .with_registered(1, "alice")
            .with_registered(2, "bob")
            .with_registered(3, "carol")
            .failing_permissions_for(2),
    );
    let provider = StubProvider::new(vec![
        linked_member(10, "alice", Some(1)),
        linked_member(20, "bob", Some(2)),
        linked_member(30, "carol", Some(3)),
    ]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let report = engine
        .sync_all(&AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(report.updated, 2);
    assert_eq!(report.results.len(), 3);
    let failed = report
        .results
        .iter()
        .find(|r| matches!(r.outcome, SyncOutcome::Failed(_)))
        .unwrap();
    assert_eq!(failed.user_id, 20);

    // The other two got their ACL entries.
    assert!(gateway.acl_entry_for(1).is_some());
    assert!(gateway.acl_entry_for(2).is_none());
    assert!(gateway.acl_entry_for(3).is_some());
}

#[tokio::test]
async fn test_dry_run_makes_no_mutating_calls() {
    let gateway = Arc::new(
        RecordingGateway::new()
            .with_registered(1, "alice")
            .with_registered(2, "bob"),
    );
    let provider = StubProvider::new(vec![
        linked_member(10, "alice", Some(1)),
        // Forces the lookup-by-name fallback path, which must also stay
        // read-only under dry run.
        linked_member(20, "bob", None),
    ]);
    let accounts = Arc::new(MemoryAccounts::default());
    let engine = engine(gateway.clone(), provider, accounts.clone(), true);

    let report = engine
        .sync_all(&AdminAllowlist::default(), SyncMode::DryRun)
        .await
        .unwrap();

    assert_eq!(report.planned, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(gateway.mutation_count(), 0);
    assert_eq!(accounts.writes.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Remote id resolution
// ============================================================================

#[tokio::test]
async fn test_remote_id_fallback_is_learned_and_persisted() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(7, "alice"));
    let provider = StubProvider::new(vec![linked_member(10, "alice", None)]);
    let accounts = Arc::new(MemoryAccounts::default());
    let engine = engine(gateway.clone(), provider, accounts.clone(), true);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.outcome, SyncOutcome::Updated);
    assert_eq!(accounts.remote_ids.lock().unwrap().get(&10), Some(&7));
    assert!(gateway.acl_entry_for(7).is_some());
}

#[tokio::test]
async fn test_unregistered_identity_is_recorded_as_failed() {
    let gateway = Arc::new(RecordingGateway::new());
    let provider = StubProvider::new(vec![linked_member(10, "ghost", None)]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let report = engine
        .sync_all(&AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(gateway.mutation_count(), 0);
}

#[tokio::test]
async fn test_sync_one_unknown_account_reports_no_link() {
    let engine = engine(
        Arc::new(RecordingGateway::new()),
        StubProvider::default(),
        Arc::new(MemoryAccounts::default()),
        true,
    );
    let result = engine
        .sync_one(99, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap();
    assert!(result.is_none());
}

// ============================================================================
// Role and scope application
// ============================================================================

#[tokio::test]
async fn test_member_gets_user_bundle_on_root() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "alice"));
    let provider = StubProvider::new(vec![linked_member(10, "alice", Some(1))]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.role, Role::Member);
    let (channel_id, entry) = gateway.acl_entry_for(1).unwrap();
    assert_eq!(channel_id, 0);
    assert_eq!(entry.allow, ChannelPermissions::ROLE_USER.bits());
    assert_eq!(entry.deny, 0);
}

#[tokio::test]
async fn test_allowlisted_member_gets_admin_bundle() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "alice"));
    let provider = StubProvider::new(vec![linked_member(10, "alice", Some(1))]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let allowlist = AdminAllowlist::from_comma_list("alice");
    let result = engine
        .sync_one(10, &allowlist, SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.role, Role::Admin);
    let (channel_id, entry) = gateway.acl_entry_for(1).unwrap();
    assert_eq!(channel_id, 0);
    assert_eq!(entry.allow, ChannelPermissions::ROLE_ADMIN.bits());
}

#[tokio::test]
async fn test_director_gets_kickless_moderator_in_corp_channel() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "carol Prime"));
    let linked = with_affiliation(
        linked_member(10, "carol", Some(1)),
        9001,
        Some(4242),
        &["Director"],
    );
    let provider = StubProvider::new(vec![linked]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.role, Role::CorpDirector);

    // The corporation channel was created on demand and holds the entry.
    let corp = gateway.channel_named("[TEST] Test Corp").unwrap();
    let (channel_id, entry) = gateway.acl_entry_for(1).unwrap();
    assert_eq!(channel_id, corp.id);
    assert_eq!(
        entry.allow,
        (ChannelPermissions::ROLE_MODERATOR - ChannelPermissions::KICK).bits()
    );
}

#[tokio::test]
async fn test_ceo_reuses_existing_corp_channel() {
    let gateway = Arc::new(
        RecordingGateway::new()
            .with_registered(1, "bob Prime")
            .with_channel(55, "[TEST] Test Corp"),
    );
    let linked = with_affiliation(linked_member(10, "bob", Some(1)), 9001, Some(9001), &[]);
    let provider = StubProvider::new(vec![linked]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.role, Role::CorpCeo);
    assert_eq!(result.channel_id, 55);
    assert_eq!(gateway.channel_creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_scope_channel_falls_back_to_root_when_creation_disabled() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "frank"));
    let mut linked = linked_member(10, "frank", Some(1));
    linked.identity.roles = vec!["fleet_commander".to_string()];
    let provider = StubProvider::new(vec![linked]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), false);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.role, Role::FleetCommander);
    assert_eq!(result.channel_id, 0);
    assert_eq!(gateway.channel_creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fleet_channel_created_on_demand() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "frank"));
    let mut linked = linked_member(10, "frank", Some(1));
    linked.identity.roles = vec!["fc".to_string()];
    let provider = StubProvider::new(vec![linked]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    let result = engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    let fleet = gateway.channel_named("Fleet Operations").unwrap();
    assert_eq!(result.channel_id, fleet.id);
}

// ============================================================================
// Display names
// ============================================================================

#[tokio::test]
async fn test_nickname_is_pushed_to_the_remote_registration() {
    let gateway = Arc::new(RecordingGateway::new().with_registered(1, "alice"));
    let mut linked = linked_member(10, "alice", Some(1));
    linked.identity.nickname = Some("Boss".to_string());
    let provider = StubProvider::new(vec![linked]);
    let engine = engine(gateway.clone(), provider, Arc::new(MemoryAccounts::default()), true);

    engine
        .sync_one(10, &AdminAllowlist::default(), SyncMode::Apply)
        .await
        .unwrap()
        .unwrap();

    let users = gateway.users.lock().unwrap();
    assert_eq!(users.get(&1).unwrap().name, "Boss");
}
