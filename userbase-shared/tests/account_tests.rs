/// Integration tests for accounts
///
/// Run with: cargo test --test account_tests
/// Requires DATABASE_URL (see tests/common/mod.rs).

mod common;

use userbase_shared::auth::activation::generate_activation_code;
use userbase_shared::error::Error;
use userbase_shared::models::account::{Account, CreateAccount, SiteRole, UpdateAccount};
use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
use userbase_shared::models::profile::{CreateProfile, Profile};
use uuid::Uuid;

#[tokio::test]
async fn test_create_account_defaults() {
    let Some(pool) = common::test_pool().await else { return };
    let username = common::unique("alice");

    let data = CreateAccount::with_password(
        &username,
        &format!("{}@example.com", username),
        "S3cret!pass",
    )
    .unwrap();
    let account = Account::create(&pool, data).await.expect("create failed");

    assert_eq!(account.username, username);
    assert!(!account.is_active);
    assert!(!account.is_staff);
    assert!(!account.is_superuser);
    assert_eq!(account.site_role, SiteRole::User);
    assert!(account.activation_code.is_none());
    assert!(account.last_login.is_none());
    assert!(account.check_password("S3cret!pass").unwrap());

    let found = Account::find_by_username(&pool, &username).await.unwrap().unwrap();
    assert_eq!(found.id, account.id);
    let found = Account::find_by_email(&pool, &account.email).await.unwrap().unwrap();
    assert_eq!(found.id, account.id);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let Some(pool) = common::test_pool().await else { return };
    let existing = common::create_account(&pool).await;

    let data = CreateAccount {
        username: existing.username.clone(),
        email: format!("{}@example.com", common::unique("other")),
        password_hash: existing.password_hash.clone(),
        first_name: None,
        last_name: None,
    };
    let err = Account::create(&pool, data).await.unwrap_err();

    assert!(
        matches!(&err, Error::Conflict { constraint } if constraint == "accounts_username_key"),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let Some(pool) = common::test_pool().await else { return };
    let existing = common::create_account(&pool).await;

    let data = CreateAccount {
        username: common::unique("other"),
        email: existing.email.clone(),
        password_hash: existing.password_hash.clone(),
        first_name: None,
        last_name: None,
    };
    let err = Account::create(&pool, data).await.unwrap_err();

    assert!(
        matches!(&err, Error::Conflict { constraint } if constraint == "accounts_email_key"),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_invalid_username_rejected_before_insert() {
    let Some(pool) = common::test_pool().await else { return };
    let email = format!("{}@example.com", common::unique("x"));

    let data = CreateAccount {
        username: "no spaces allowed".to_string(),
        email: email.clone(),
        password_hash: "hash".to_string(),
        first_name: None,
        last_name: None,
    };
    let err = Account::create(&pool, data).await.unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(Account::find_by_email(&pool, &email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_account() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    let updated = Account::update(
        &pool,
        account.id,
        UpdateAccount {
            first_name: Some(Some("Alice".to_string())),
            last_name: Some(Some("Liddell".to_string())),
            is_staff: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.first_name.as_deref(), Some("Alice"));
    assert_eq!(updated.last_name.as_deref(), Some("Liddell"));
    assert!(updated.is_staff);
    assert_eq!(updated.username, account.username);

    let cleared = Account::update(
        &pool,
        account.id,
        UpdateAccount {
            last_name: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(cleared.first_name.as_deref(), Some("Alice"));
    assert!(cleared.last_name.is_none());
}

#[tokio::test]
async fn test_update_rejects_bad_username() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    let err = Account::update(
        &pool,
        account.id,
        UpdateAccount {
            username: Some("bad name!".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_update_missing_account() {
    let Some(pool) = common::test_pool().await else { return };

    let result = Account::update(
        &pool,
        Uuid::new_v4(),
        UpdateAccount {
            is_staff: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_activation_flow() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    let code = Account::issue_activation_code(&pool, account.id, 20)
        .await
        .unwrap()
        .expect("account exists");
    assert_eq!(code.len(), 20);

    // wrong code leaves the account inactive
    let wrong = generate_activation_code(20);
    assert!(!Account::activate(&pool, account.id, &wrong).await.unwrap());
    let reloaded = Account::find_by_id(&pool, account.id).await.unwrap().unwrap();
    assert!(!reloaded.is_active);
    assert_eq!(reloaded.activation_code.as_deref(), Some(code.as_str()));

    assert!(Account::activate(&pool, account.id, &code).await.unwrap());
    let reloaded = Account::find_by_id(&pool, account.id).await.unwrap().unwrap();
    assert!(reloaded.is_active);
    assert!(reloaded.activation_code.is_none());

    // codes work once
    assert!(!Account::activate(&pool, account.id, &code).await.unwrap());

    assert!(Account::deactivate(&pool, account.id).await.unwrap());
    let reloaded = Account::find_by_id(&pool, account.id).await.unwrap().unwrap();
    assert!(!reloaded.is_active);
}

#[tokio::test]
async fn test_reissued_code_replaces_previous() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    let first = Account::issue_activation_code(&pool, account.id, 12)
        .await
        .unwrap()
        .unwrap();
    let second = Account::issue_activation_code(&pool, account.id, 12)
        .await
        .unwrap()
        .unwrap();

    if first != second {
        assert!(!Account::activate(&pool, account.id, &first).await.unwrap());
    }
    assert!(Account::activate(&pool, account.id, &second).await.unwrap());
}

#[tokio::test]
async fn test_issue_code_for_missing_account() {
    let Some(pool) = common::test_pool().await else { return };

    let code = Account::issue_activation_code(&pool, Uuid::new_v4(), 20)
        .await
        .unwrap();
    assert!(code.is_none());
    assert!(!Account::activate(&pool, Uuid::new_v4(), "abcdefgh12")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_set_password_and_login() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    assert!(Account::set_password(&pool, account.id, "N3w!password").await.unwrap());
    assert!(Account::record_login(&pool, account.id).await.unwrap());

    let reloaded = Account::find_by_id(&pool, account.id).await.unwrap().unwrap();
    assert!(reloaded.check_password("N3w!password").unwrap());
    assert!(!reloaded.check_password("old").unwrap());
    assert!(reloaded.last_login.is_some());
}

#[tokio::test]
async fn test_set_site_role() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    assert!(Account::set_site_role(&pool, account.id, SiteRole::Moderator)
        .await
        .unwrap());

    let reloaded = Account::find_by_id(&pool, account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.site_role, SiteRole::Moderator);
    assert!(reloaded.is_site_moderator());
    assert!(!reloaded.is_site_admin());
}

#[tokio::test]
async fn test_delete_removes_owned_rows() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;
    let permission = common::create_permission(&pool).await;

    Profile::create(
        &pool,
        CreateProfile {
            account_id: account.id,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin)
        .await
        .unwrap();
    Account::join_group(&pool, account.id, group.id).await.unwrap();
    Account::grant_permission(&pool, account.id, permission.id)
        .await
        .unwrap();

    assert!(Account::delete(&pool, account.id).await.unwrap());

    assert!(Account::find_by_id(&pool, account.id).await.unwrap().is_none());
    assert!(Profile::find_by_account(&pool, account.id).await.unwrap().is_none());
    assert!(GroupRoleAssignment::list_for_account(&pool, account.id)
        .await
        .unwrap()
        .is_empty());
    assert!(group.members(&pool).await.unwrap().is_empty());

    // second delete finds nothing
    assert!(!Account::delete(&pool, account.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_waits_for_concurrent_child_insert() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;
    let group = common::create_group(&pool).await;

    // an uncommitted writer holds a key-share lock on the account
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("INSERT INTO profiles (account_id) VALUES ($1)")
        .bind(account.id)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("INSERT INTO group_roles (account_id, group_id) VALUES ($1, $2)")
        .bind(account.id)
        .bind(group.id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let delete = tokio::spawn({
        let pool = pool.clone();
        let id = account.id;
        async move { Account::delete(&pool, id).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert!(!delete.is_finished(), "delete should block on the row lock");

    tx.commit().await.unwrap();

    let deleted = delete.await.unwrap().expect("delete failed");
    assert!(deleted);

    assert!(Account::find_by_id(&pool, account.id).await.unwrap().is_none());
    assert!(Profile::find_by_account(&pool, account.id).await.unwrap().is_none());
    assert!(GroupRoleAssignment::list_for_account(&pool, account.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_child_insert_after_delete_is_missing_reference() {
    let Some(pool) = common::test_pool().await else { return };
    let account = common::create_account(&pool).await;

    assert!(Account::delete(&pool, account.id).await.unwrap());

    let err = Profile::create(
        &pool,
        CreateProfile {
            account_id: account.id,
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::MissingReference { .. }));
}

#[tokio::test]
async fn test_list_and_count() {
    let Some(pool) = common::test_pool().await else { return };
    common::create_account(&pool).await;
    common::create_account(&pool).await;

    assert!(Account::count(&pool).await.unwrap() >= 2);

    let page = Account::list(&pool, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page[0].date_joined >= page[1].date_joined);

    let total = Account::count(&pool).await.unwrap();
    let past_end = Account::list(&pool, 10, total + 1000).await.unwrap();
    assert!(past_end.is_empty());
}
