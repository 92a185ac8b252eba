/// Permission model and database operations
///
/// A permission is identified by its `codename` (e.g. `posts.delete`), which is
/// what [`Account::has_permission`](super::account::Account::has_permission)
/// checks. Permissions are granted to accounts directly or to groups.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     codename VARCHAR(100) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,

    /// Unique machine name checked by `has_permission`
    pub codename: String,

    /// Human-readable description
    pub name: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Validate)]
struct NewPermission<'a> {
    #[validate(length(min = 1, max = 100), custom(function = "validate_codename"))]
    codename: &'a str,

    #[validate(length(min = 1, max = 255))]
    name: &'a str,
}

/// Codenames use lowercase letters, digits, `_` and `.`
fn validate_codename(codename: &str) -> std::result::Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.');

    if codename.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("codename_characters"))
    }
}

impl Permission {
    /// Creates a permission
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the codename or name is malformed
    /// - `Error::Conflict` if the codename is taken
    pub async fn create(pool: &PgPool, codename: &str, name: &str) -> Result<Self> {
        NewPermission { codename, name }.validate()?;

        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (codename, name)
            VALUES ($1, $2)
            RETURNING id, codename, name, created_at
            "#,
        )
        .bind(codename)
        .bind(name)
        .fetch_one(pool)
        .await?;

        info!(permission_id = %permission.id, codename, "Permission created");
        Ok(permission)
    }

    pub async fn find_by_codename(pool: &PgPool, codename: &str) -> Result<Option<Self>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT id, codename, name, created_at FROM permissions WHERE codename = $1",
        )
        .bind(codename)
        .fetch_optional(pool)
        .await?;

        Ok(permission)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, codename, name, created_at FROM permissions ORDER BY codename ASC",
        )
        .fetch_all(pool)
        .await?;

        Ok(permissions)
    }

    /// Deletes a permission and all its direct and group grants
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM permissions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM account_permissions WHERE permission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM group_permissions WHERE permission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_delete)?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
