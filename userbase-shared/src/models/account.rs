/// Account model and database operations
///
/// An account is the authenticatable identity of the system. Besides
/// credentials it carries activation state, an account-wide site role, coarse
/// group membership and direct permission grants. Per-group roles live in
/// [`group_role`](super::group_role).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE site_role AS ENUM ('user', 'moderator', 'admin', 'superuser');
///
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150),
///     last_name VARCHAR(150),
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT FALSE,
///     activation_code VARCHAR(20),
///     site_role site_role NOT NULL DEFAULT 'user',
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
/// ```
///
/// Accounts own their profile, group role assignments, group memberships and
/// direct permission grants. None of these cascade in the schema;
/// [`Account::delete`] removes them explicitly in one transaction.
///
/// # Example
///
/// ```no_run
/// use userbase_shared::models::account::{Account, CreateAccount};
/// use userbase_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let data = CreateAccount::with_password("alice", "alice@example.com", "S3cret!pass")?;
/// let account = Account::create(&pool, data).await?;
///
/// let code = Account::issue_activation_code(&pool, account.id, 20).await?;
/// if let Some(code) = code {
///     assert!(Account::activate(&pool, account.id, &code).await?);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::group::Group;
use super::group_role::Role;
use super::permission::Permission;
use crate::auth::activation::{codes_match, generate_activation_code, validate_code_format};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{Error, Result};

/// Account-wide role, independent of any group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "site_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SiteRole {
    #[default]
    User,
    Moderator,
    Admin,
    Superuser,
}

impl SiteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteRole::User => "user",
            SiteRole::Moderator => "moderator",
            SiteRole::Admin => "admin",
            SiteRole::Superuser => "superuser",
        }
    }
}

impl fmt::Display for SiteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown site role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown site role '{0}' (expected user, moderator, admin or superuser)")]
pub struct ParseSiteRoleError(pub String);

impl FromStr for SiteRole {
    type Err = ParseSiteRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(SiteRole::User),
            "moderator" => Ok(SiteRole::Moderator),
            "admin" => Ok(SiteRole::Admin),
            "superuser" => Ok(SiteRole::Superuser),
            other => Err(ParseSiteRoleError(other.to_string())),
        }
    }
}

/// Account model
///
/// `password_hash` is an Argon2id PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Unique email address
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// Can access staff tooling
    pub is_staff: bool,

    /// Treated as a site admin regardless of `site_role`
    pub is_superuser: bool,

    /// Login is refused until the account is activated
    pub is_active: bool,

    /// Pending activation code, cleared on activation
    #[serde(skip_serializing)]
    pub activation_code: Option<String>,

    pub site_role: SiteRole,

    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a new account
///
/// New accounts are inactive, with the `user` site role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccount {
    /// 1 to 150 characters: letters, digits and `@ . + - _`
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    /// Argon2id hash, not a plaintext password
    pub password_hash: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,
}

impl CreateAccount {
    /// Builds account input, hashing `password`
    pub fn with_password(username: &str, email: &str, password: &str) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            first_name: None,
            last_name: None,
        })
    }
}

/// Input for updating an existing account
///
/// Only `Some` fields are written. Nullable columns use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAccount {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');

    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("username_characters"))
    }
}

const COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                       is_staff, is_superuser, is_active, activation_code, site_role, \
                       date_joined, updated_at, last_login";

impl Account {
    /// Creates a new account
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the username or email is malformed
    /// - `Error::Conflict` if the username or email is taken
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self> {
        data.validate()?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (username, email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .fetch_one(pool)
        .await?;

        info!(account_id = %account.id, username = %account.username, "Account created");
        Ok(account)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    /// Lists accounts, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM accounts ORDER BY date_joined DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(accounts)
    }

    /// Updates an account
    ///
    /// # Returns
    ///
    /// The updated account, or None if it doesn't exist
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if a new username or email is malformed
    /// - `Error::Conflict` if a new username or email is taken
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateAccount) -> Result<Option<Self>> {
        data.validate()?;

        let mut query = String::from("UPDATE accounts SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.username.is_some() {
            bind_count += 1;
            query.push_str(&format!(", username = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if data.is_staff.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_staff = ${}", bind_count));
        }
        if data.is_superuser.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_superuser = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Account>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(is_staff) = data.is_staff {
            q = q.bind(is_staff);
        }
        if let Some(is_superuser) = data.is_superuser {
            q = q.bind(is_superuser);
        }

        let account = q.fetch_optional(pool).await?;

        Ok(account)
    }

    /// Deletes an account together with everything it owns
    ///
    /// Removes, in one transaction: the profile, all group role assignments,
    /// coarse group memberships, direct permission grants, then the account.
    ///
    /// The account row is locked first, so a concurrent insert of an owned row
    /// either commits before the cleanup runs or fails with
    /// `Error::MissingReference` once the account is gone.
    ///
    /// # Returns
    ///
    /// True if the account existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(false);
        }

        for table in ["profiles", "group_roles", "account_groups", "account_permissions"] {
            let removed = sqlx::query(&format!("DELETE FROM {table} WHERE account_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(account_id = %id, table, removed, "Removed owned rows");
        }

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_delete)?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(account_id = %id, "Account deleted");
        }
        Ok(deleted)
    }

    /// Counts all accounts
    pub async fn count(pool: &PgPool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    // --- Credentials -------------------------------------------------------

    /// Checks a plaintext password against this account's hash
    pub fn check_password(&self, password: &str) -> Result<bool> {
        Ok(verify_password(password, &self.password_hash)?)
    }

    /// Hashes and stores a new password
    ///
    /// # Returns
    ///
    /// True if the account exists
    pub async fn set_password(pool: &PgPool, id: Uuid, password: &str) -> Result<bool> {
        let password_hash = hash_password(password)?;

        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamps `last_login` with the current time
    pub async fn record_login(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // --- Activation --------------------------------------------------------

    /// Generates and stores a fresh activation code
    ///
    /// Any previous code is replaced. `length` is clamped to the range the
    /// column accepts.
    ///
    /// # Returns
    ///
    /// The new code, or None if the account doesn't exist
    pub async fn issue_activation_code(
        pool: &PgPool,
        id: Uuid,
        length: usize,
    ) -> Result<Option<String>> {
        let code = generate_activation_code(length);

        let result = sqlx::query(
            "UPDATE accounts SET activation_code = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&code)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(account_id = %id, "Activation code issued");
        Ok(Some(code))
    }

    /// Activates the account if `code` matches the stored activation code
    ///
    /// On success the account becomes active and the code is cleared, so a code
    /// works once.
    ///
    /// # Returns
    ///
    /// True if the account was activated, false on a wrong code, a missing
    /// code, or a missing account
    pub async fn activate(pool: &PgPool, id: Uuid, code: &str) -> Result<bool> {
        if !validate_code_format(code) {
            return Ok(false);
        }

        let mut tx = pool.begin().await?;

        let stored = sqlx::query_scalar::<_, Option<String>>(
            "SELECT activation_code FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        let matches = stored
            .as_deref()
            .is_some_and(|stored| codes_match(code, stored));

        if !matches {
            warn!(account_id = %id, "Activation rejected");
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE accounts
            SET is_active = TRUE, activation_code = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(account_id = %id, "Account activated");
        Ok(true)
    }

    /// Marks the account inactive
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // --- Site role ---------------------------------------------------------

    /// Site admin: `admin` site role or the superuser flag
    pub fn is_site_admin(&self) -> bool {
        self.is_superuser || matches!(self.site_role, SiteRole::Admin | SiteRole::Superuser)
    }

    pub fn is_site_moderator(&self) -> bool {
        matches!(self.site_role, SiteRole::Moderator)
    }

    pub fn is_site_user(&self) -> bool {
        matches!(self.site_role, SiteRole::User)
    }

    pub async fn set_site_role(pool: &PgPool, id: Uuid, role: SiteRole) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET site_role = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(role)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // --- Group roles -------------------------------------------------------

    pub async fn is_admin_in_any_group(&self, pool: &PgPool) -> Result<bool> {
        self.has_role_in_any_group(pool, Role::Admin).await
    }

    pub async fn is_moderator_in_any_group(&self, pool: &PgPool) -> Result<bool> {
        self.has_role_in_any_group(pool, Role::Moderator).await
    }

    pub async fn is_user_in_any_group(&self, pool: &PgPool) -> Result<bool> {
        self.has_role_in_any_group(pool, Role::User).await
    }

    /// True if at least one of this account's assignments has exactly `role`
    pub async fn has_role_in_any_group(&self, pool: &PgPool, role: Role) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_roles WHERE account_id = $1 AND role = $2)",
        )
        .bind(self.id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// This account's role in a group, or None if it has no assignment there
    pub async fn get_role_in_group(&self, pool: &PgPool, group_id: Uuid) -> Result<Option<Role>> {
        let role: Option<Role> = sqlx::query_scalar(
            "SELECT role FROM group_roles WHERE account_id = $1 AND group_id = $2",
        )
        .bind(self.id)
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    // --- Permissions -------------------------------------------------------

    /// True if `codename` is granted directly or through any joined group
    ///
    /// Only coarse group membership (`account_groups`) counts here; group role
    /// assignments do not grant permissions.
    pub async fn has_permission(&self, pool: &PgPool, codename: &str) -> Result<bool> {
        let granted: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM account_permissions ap
                JOIN permissions p ON p.id = ap.permission_id
                WHERE ap.account_id = $1 AND p.codename = $2
            ) OR EXISTS(
                SELECT 1
                FROM account_groups ag
                JOIN group_permissions gp ON gp.group_id = ag.group_id
                JOIN permissions p ON p.id = gp.permission_id
                WHERE ag.account_id = $1 AND p.codename = $2
            )
            "#,
        )
        .bind(self.id)
        .bind(codename)
        .fetch_one(pool)
        .await?;

        debug!(account_id = %self.id, codename, granted, "Permission check");
        Ok(granted)
    }

    /// Grants a permission directly; granting twice is a no-op
    pub async fn grant_permission(pool: &PgPool, id: Uuid, permission_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_permissions (account_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(permission_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn revoke_permission(pool: &PgPool, id: Uuid, permission_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM account_permissions WHERE account_id = $1 AND permission_id = $2")
            .bind(id)
            .bind(permission_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Permissions granted directly to this account (not via groups)
    pub async fn permissions(&self, pool: &PgPool) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.codename, p.name, p.created_at
            FROM permissions p
            JOIN account_permissions ap ON ap.permission_id = p.id
            WHERE ap.account_id = $1
            ORDER BY p.codename ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        Ok(permissions)
    }

    // --- Coarse group membership -------------------------------------------

    /// Adds the account to a group's member list; joining twice is a no-op
    ///
    /// This does not create a group role assignment.
    pub async fn join_group(pool: &PgPool, id: Uuid, group_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_groups (account_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(group_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes the account from a group's member list
    ///
    /// Any group role assignment in that group is left in place.
    pub async fn leave_group(pool: &PgPool, id: Uuid, group_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM account_groups WHERE account_id = $1 AND group_id = $2")
            .bind(id)
            .bind(group_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Groups this account is a member of
    pub async fn groups(&self, pool: &PgPool) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.created_at
            FROM groups g
            JOIN account_groups ag ON ag.group_id = g.id
            WHERE ag.account_id = $1
            ORDER BY g.name ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }
}
