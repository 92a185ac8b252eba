/// Authorization checks built on accounts, group roles and permissions
///
/// Request handlers call these to turn a boolean lookup into an early return:
///
/// 1. **Activation**: inactive accounts are refused outright
/// 2. **Group roles**: an account needs an assignment in the group at or above
///    a minimum [`Role`]
/// 3. **Permissions**: codename checks through direct and group grants
///
/// # Example
///
/// ```no_run
/// use userbase_shared::auth::authorization::{require_active, require_group_role, require_permission};
/// use userbase_shared::models::account::Account;
/// use userbase_shared::models::group_role::Role;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// async fn moderate(pool: &PgPool, account: &Account, group_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
///     require_active(account)?;
///     require_group_role(pool, account, group_id, Role::Moderator).await?;
///     require_permission(pool, account, "posts.hide").await?;
///     Ok(())
/// }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Error;
use crate::models::account::Account;
use crate::models::group_role::Role;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Account has not been activated
    #[error("Account {0} is not active")]
    Inactive(Uuid),

    /// Account has no role in the group
    #[error("No role in group {0}")]
    NoGroupRole(Uuid),

    /// Account's role in the group is too low
    #[error("Insufficient role: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// Permission not granted directly or through any group
    #[error("Missing permission: {0}")]
    MissingPermission(String),

    /// Lookup failed
    #[error(transparent)]
    Store(#[from] Error),
}

/// Refuses inactive accounts
pub fn require_active(account: &Account) -> Result<(), AuthzError> {
    if !account.is_active {
        return Err(AuthzError::Inactive(account.id));
    }

    Ok(())
}

/// Requires a role in `group_id` at or above `required`
///
/// # Errors
///
/// - `AuthzError::NoGroupRole` if the account has no assignment in the group
/// - `AuthzError::InsufficientRole` if the assigned role is lower
pub async fn require_group_role(
    pool: &PgPool,
    account: &Account,
    group_id: Uuid,
    required: Role,
) -> Result<Role, AuthzError> {
    let actual = account
        .get_role_in_group(pool, group_id)
        .await?
        .ok_or(AuthzError::NoGroupRole(group_id))?;

    if !actual.has_at_least(required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }

    Ok(actual)
}

/// Requires a permission codename
pub async fn require_permission(
    pool: &PgPool,
    account: &Account,
    codename: &str,
) -> Result<(), AuthzError> {
    if !account.has_permission(pool, codename).await? {
        return Err(AuthzError::MissingPermission(codename.to_string()));
    }

    Ok(())
}
