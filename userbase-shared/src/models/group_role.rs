/// Group role assignment model and database operations
///
/// A group role assignment binds one account to one group with exactly one
/// [`Role`]. It is independent of the coarse account↔group membership list
/// (`account_groups`): adding a role does not join the group, and joining a
/// group does not grant a role.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE group_role AS ENUM ('user', 'moderator', 'admin');
///
/// CREATE TABLE group_roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL REFERENCES accounts(id),
///     group_id UUID NOT NULL REFERENCES groups(id),
///     role group_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT group_roles_account_group_key UNIQUE (account_id, group_id)
/// );
/// ```
///
/// Rows are removed explicitly when their account or group is deleted; see
/// `Account::delete` and `Group::delete`.
///
/// # Example
///
/// ```no_run
/// use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, account_id: Uuid, group_id: Uuid) -> userbase_shared::error::Result<()> {
/// GroupRoleAssignment::add_role(&pool, account_id, group_id, Role::Moderator).await?;
/// GroupRoleAssignment::change_role(&pool, account_id, group_id, Role::Admin).await?;
/// GroupRoleAssignment::remove_role(&pool, account_id, group_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;

/// Role an account holds inside a single group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular participant
    #[default]
    User,

    /// Can moderate group content
    Moderator,

    /// Full control over the group
    Admin,
}

impl Role {
    /// All roles, lowest first
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// True if this role is at or above `required`
    ///
    /// Hierarchy: Admin > Moderator > User
    pub fn has_at_least(&self, required: Role) -> bool {
        self.level() >= required.level()
    }

    fn level(&self) -> u8 {
        match self {
            Role::User => 1,
            Role::Moderator => 2,
            Role::Admin => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role '{0}' (expected user, moderator or admin)")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or(ParseRoleError(name))
    }
}

/// One row of `group_roles`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupRoleAssignment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub group_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignment joined with the account and group names, for display
///
/// Formats as `"{username} - {group_name} - {role}"`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentSummary {
    pub username: String,
    pub group_name: String,
    pub role: Role,
}

impl fmt::Display for AssignmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.username, self.group_name, self.role)
    }
}

const COLUMNS: &str = "id, account_id, group_id, role, created_at, updated_at";

impl GroupRoleAssignment {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self.role, Role::Moderator)
    }

    pub fn is_user(&self) -> bool {
        matches!(self.role, Role::User)
    }

    /// Gives an account a role in a group
    ///
    /// This is an insert, not an upsert: use [`change_role`](Self::change_role)
    /// to modify an existing assignment.
    ///
    /// # Errors
    ///
    /// - `Error::Conflict` if the account already has a role in the group
    /// - `Error::MissingReference` if the account or group doesn't exist
    pub async fn add_role(
        pool: &PgPool,
        account_id: Uuid,
        group_id: Uuid,
        role: Role,
    ) -> Result<Self> {
        let assignment = sqlx::query_as::<_, GroupRoleAssignment>(&format!(
            "INSERT INTO group_roles (account_id, group_id, role) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        ))
        .bind(account_id)
        .bind(group_id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        info!(%account_id, %group_id, role = %role, "Group role added");
        Ok(assignment)
    }

    /// Removes an account's role in a group
    ///
    /// Does nothing if there is no assignment.
    pub async fn remove_role(pool: &PgPool, account_id: Uuid, group_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM group_roles WHERE account_id = $1 AND group_id = $2")
            .bind(account_id)
            .bind(group_id)
            .execute(pool)
            .await?;

        debug!(
            %account_id,
            %group_id,
            rows = result.rows_affected(),
            "Group role removed"
        );
        Ok(())
    }

    /// Overwrites the role of an existing assignment
    ///
    /// Does nothing if there is no assignment; it never creates one.
    pub async fn change_role(
        pool: &PgPool,
        account_id: Uuid,
        group_id: Uuid,
        role: Role,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE group_roles
            SET role = $3, updated_at = NOW()
            WHERE account_id = $1 AND group_id = $2
            "#,
        )
        .bind(account_id)
        .bind(group_id)
        .bind(role)
        .execute(pool)
        .await?;

        debug!(
            %account_id,
            %group_id,
            role = %role,
            rows = result.rows_affected(),
            "Group role changed"
        );
        Ok(())
    }

    /// Finds the assignment for an (account, group) pair
    pub async fn find(pool: &PgPool, account_id: Uuid, group_id: Uuid) -> Result<Option<Self>> {
        let assignment = sqlx::query_as::<_, GroupRoleAssignment>(&format!(
            "SELECT {COLUMNS} FROM group_roles WHERE account_id = $1 AND group_id = $2"
        ))
        .bind(account_id)
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        Ok(assignment)
    }

    /// Lists every assignment held by an account, oldest first
    pub async fn list_for_account(pool: &PgPool, account_id: Uuid) -> Result<Vec<Self>> {
        let assignments = sqlx::query_as::<_, GroupRoleAssignment>(&format!(
            "SELECT {COLUMNS} FROM group_roles WHERE account_id = $1 ORDER BY created_at ASC"
        ))
        .bind(account_id)
        .fetch_all(pool)
        .await?;

        Ok(assignments)
    }

    /// Lists every assignment inside a group, oldest first
    pub async fn list_for_group(pool: &PgPool, group_id: Uuid) -> Result<Vec<Self>> {
        let assignments = sqlx::query_as::<_, GroupRoleAssignment>(&format!(
            "SELECT {COLUMNS} FROM group_roles WHERE group_id = $1 ORDER BY created_at ASC"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(assignments)
    }

    /// Loads the display form of an account's assignments
    pub async fn summaries_for_account(
        pool: &PgPool,
        account_id: Uuid,
    ) -> Result<Vec<AssignmentSummary>> {
        let summaries = sqlx::query_as::<_, AssignmentSummary>(
            r#"
            SELECT a.username, g.name AS group_name, gr.role
            FROM group_roles gr
            JOIN accounts a ON a.id = gr.account_id
            JOIN groups g ON g.id = gr.group_id
            WHERE gr.account_id = $1
            ORDER BY g.name ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(pool)
        .await?;

        Ok(summaries)
    }

    /// Loads the display form of this assignment
    pub async fn summary(&self, pool: &PgPool) -> Result<AssignmentSummary> {
        let summary = sqlx::query_as::<_, AssignmentSummary>(
            r#"
            SELECT a.username, g.name AS group_name, gr.role
            FROM group_roles gr
            JOIN accounts a ON a.id = gr.account_id
            JOIN groups g ON g.id = gr.group_id
            WHERE gr.id = $1
            "#,
        )
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(summary)
    }
}
