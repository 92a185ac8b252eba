/// Group model and database operations
///
/// A group is a named set of accounts that carries permissions. Accounts reach
/// a group two independent ways:
///
/// - coarse membership (`account_groups`), which grants the group's permissions
/// - a group role assignment (`group_roles`), which ranks the account inside
///   the group
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(150) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE group_permissions (
///     group_id UUID NOT NULL REFERENCES groups(id),
///     permission_id UUID NOT NULL REFERENCES permissions(id),
///     PRIMARY KEY (group_id, permission_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::account::Account;
use super::permission::Permission;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,

    /// Unique group name
    pub name: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
struct NewGroup<'a> {
    #[validate(length(min = 1, max = 150), custom(function = "validate_group_name"))]
    name: &'a str,
}

fn validate_group_name(name: &str) -> std::result::Result<(), ValidationError> {
    if name.trim().is_empty() || name.trim() != name {
        return Err(ValidationError::new("group_name_whitespace"));
    }

    Ok(())
}

impl Group {
    /// Creates a group
    ///
    /// Names are 1 to 150 characters without leading or trailing whitespace.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the name is malformed
    /// - `Error::Conflict` if the name is taken
    pub async fn create(pool: &PgPool, name: &str) -> Result<Self> {
        NewGroup { name }.validate()?;

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;

        info!(group_id = %group.id, name = %group.name, "Group created");
        Ok(group)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let group = sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(group)
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>> {
        let group =
            sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM groups WHERE name = $1")
                .bind(name)
                .fetch_optional(pool)
                .await?;

        Ok(group)
    }

    /// Lists all groups by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let groups =
            sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM groups ORDER BY name ASC")
                .fetch_all(pool)
                .await?;

        Ok(groups)
    }

    /// Deletes a group and every row that points at it
    ///
    /// Role assignments, memberships and permission grants for the group are
    /// removed in the same transaction, after the group row is locked.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM groups WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(false);
        }

        for table in ["group_roles", "account_groups", "group_permissions"] {
            let removed = sqlx::query(&format!("DELETE FROM {table} WHERE group_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(group_id = %id, table, removed, "Removed dependent rows");
        }

        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_delete)?;

        tx.commit().await?;

        info!(group_id = %id, "Group deleted");
        Ok(result.rows_affected() > 0)
    }

    /// Grants a permission to every member of the group; granting twice is a no-op
    pub async fn grant_permission(pool: &PgPool, id: Uuid, permission_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO group_permissions (group_id, permission_id)
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
        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1 AND permission_id = $2")
            .bind(id)
            .bind(permission_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn permissions(&self, pool: &PgPool) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.codename, p.name, p.created_at
            FROM permissions p
            JOIN group_permissions gp ON gp.permission_id = p.id
            WHERE gp.group_id = $1
            ORDER BY p.codename ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        Ok(permissions)
    }

    /// Accounts on the group's coarse member list
    pub async fn members(&self, pool: &PgPool) -> Result<Vec<Account>> {
        let members = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.id, a.username, a.email, a.password_hash, a.first_name, a.last_name,
                   a.is_staff, a.is_superuser, a.is_active, a.activation_code, a.site_role,
                   a.date_joined, a.updated_at, a.last_login
            FROM accounts a
            JOIN account_groups ag ON ag.account_id = a.id
            WHERE ag.group_id = $1
            ORDER BY a.username ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }
}
