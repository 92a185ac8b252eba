/// Integration tests for group role assignments
///
/// Run with: cargo test --test group_role_tests
/// Requires DATABASE_URL (see tests/common/mod.rs).

mod common;

use userbase_shared::error::Error;
use userbase_shared::models::account::Account;
use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
use uuid::Uuid;

#[tokio::test]
async fn test_add_role_then_get_role() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    let assignment = GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Moderator)
        .await
        .expect("add_role failed");

    assert!(assignment.is_moderator());
    assert_eq!(
        account.get_role_in_group(&pool, group.id).await.unwrap(),
        Some(Role::Moderator)
    );
}

#[tokio::test]
async fn test_add_role_twice_conflicts() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::User)
        .await
        .expect("first add_role failed");

    let err = GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, Error::Conflict { constraint } if constraint == "group_roles_account_group_key"),
        "unexpected error: {:?}",
        err
    );

    // first role is untouched
    assert_eq!(
        account.get_role_in_group(&pool, group.id).await.unwrap(),
        Some(Role::User)
    );
}

#[tokio::test]
async fn test_concurrent_add_role_one_wins() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    let (a, b) = tokio::join!(
        GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::User),
        GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let failed = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(failed.is_conflict());
}

#[tokio::test]
async fn test_add_role_unknown_group() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    let err = GroupRoleAssignment::add_role(&pool, account.id, Uuid::new_v4(), Role::User)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingReference { .. }));
}

#[tokio::test]
async fn test_change_role() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::User)
        .await
        .unwrap();
    GroupRoleAssignment::change_role(&pool, account.id, group.id, Role::Admin)
        .await
        .unwrap();

    assert_eq!(
        account.get_role_in_group(&pool, group.id).await.unwrap(),
        Some(Role::Admin)
    );
}

#[tokio::test]
async fn test_change_role_without_assignment_is_noop() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::change_role(&pool, account.id, group.id, Role::Admin)
        .await
        .expect("change_role should not fail");

    assert_eq!(account.get_role_in_group(&pool, group.id).await.unwrap(), None);
    assert!(GroupRoleAssignment::find(&pool, account.id, group.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_remove_role() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Moderator)
        .await
        .unwrap();
    GroupRoleAssignment::remove_role(&pool, account.id, group.id)
        .await
        .unwrap();

    assert_eq!(account.get_role_in_group(&pool, group.id).await.unwrap(), None);

    // removing again is silent
    GroupRoleAssignment::remove_role(&pool, account.id, group.id)
        .await
        .expect("second remove_role should not fail");
}

#[tokio::test]
async fn test_role_in_any_group() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let editors = common::create_group(&pool).await;
    let readers = common::create_group(&pool).await;

    assert!(!account.is_admin_in_any_group(&pool).await.unwrap());
    assert!(!account.is_moderator_in_any_group(&pool).await.unwrap());
    assert!(!account.is_user_in_any_group(&pool).await.unwrap());

    GroupRoleAssignment::add_role(&pool, account.id, editors.id, Role::Admin)
        .await
        .unwrap();
    GroupRoleAssignment::add_role(&pool, account.id, readers.id, Role::User)
        .await
        .unwrap();

    assert!(account.is_admin_in_any_group(&pool).await.unwrap());
    assert!(account.is_user_in_any_group(&pool).await.unwrap());
    assert!(!account.is_moderator_in_any_group(&pool).await.unwrap());

    GroupRoleAssignment::change_role(&pool, account.id, editors.id, Role::Moderator)
        .await
        .unwrap();

    assert!(!account.is_admin_in_any_group(&pool).await.unwrap());
    assert!(account.is_moderator_in_any_group(&pool).await.unwrap());
}

#[tokio::test]
async fn test_roles_are_per_account() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::create_account(&pool).await;
    let bob = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, alice.id, group.id, Role::Admin)
        .await
        .unwrap();

    assert!(alice.is_admin_in_any_group(&pool).await.unwrap());
    assert!(!bob.is_admin_in_any_group(&pool).await.unwrap());
    assert_eq!(bob.get_role_in_group(&pool, group.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_summary_display() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    let assignment = GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin)
        .await
        .unwrap();

    let summary = assignment.summary(&pool).await.unwrap();
    assert_eq!(
        summary.to_string(),
        format!("{} - {} - admin", account.username, group.name)
    );

    let all = GroupRoleAssignment::summaries_for_account(&pool, account.id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_role_assignment_does_not_join_group() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin)
        .await
        .unwrap();
    assert!(account.groups(&pool).await.unwrap().is_empty());

    Account::join_group(&pool, account.id, group.id).await.unwrap();
    Account::leave_group(&pool, account.id, group.id).await.unwrap();

    // leaving the member list keeps the role
    assert_eq!(
        account.get_role_in_group(&pool, group.id).await.unwrap(),
        Some(Role::Admin)
    );
}

#[tokio::test]
async fn test_list_for_group() {
    let Some(pool) = common::test_pool().await else { return };
    let alice = common::create_account(&pool).await;
    let bob = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    GroupRoleAssignment::add_role(&pool, alice.id, group.id, Role::Admin)
        .await
        .unwrap();
    GroupRoleAssignment::add_role(&pool, bob.id, group.id, Role::User)
        .await
        .unwrap();

    let rows = GroupRoleAssignment::list_for_group(&pool, group.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| r.is_admin()).count(), 1);

    let alice_rows = GroupRoleAssignment::list_for_account(&pool, alice.id)
        .await
        .unwrap();
    assert_eq!(alice_rows.len(), 1);
    assert_eq!(alice_rows[0].group_id, group.id);
}
