/// Database models for userbase
///
/// # Models
///
/// - `account`: identity, credentials, activation, site role, memberships
/// - `profile`: optional 1:1 personal attributes of an account
/// - `group`: named groups carrying permissions
/// - `permission`: permission codenames
/// - `group_role`: per-group role assignments
///
/// # Example
///
/// ```no_run
/// use userbase_shared::models::account::{Account, CreateAccount};
/// use userbase_shared::models::group::Group;
/// use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
/// use userbase_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let account = Account::create(
///     &pool,
///     CreateAccount::with_password("alice", "alice@example.com", "S3cret!pass")?,
/// )
/// .await?;
/// let group = Group::create(&pool, "editors").await?;
///
/// GroupRoleAssignment::add_role(&pool, account.id, group.id, Role::Admin).await?;
/// assert!(account.is_admin_in_any_group(&pool).await?);
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod group;
pub mod group_role;
pub mod permission;
pub mod profile;
