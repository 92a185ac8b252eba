/// Profile model and database operations
///
/// A profile holds optional personal attributes for an account. It is created
/// on its own, not when the account is created, and an account has at most
/// one. Deleting the account deletes the profile (see `Account::delete`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL UNIQUE REFERENCES accounts(id),
///     picture VARCHAR(255),
///     birth_date DATE,
///     phone_number VARCHAR(15),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use userbase_shared::models::profile::{CreateProfile, Profile};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, account_id: Uuid) -> userbase_shared::error::Result<()> {
/// let profile = Profile::create(&pool, CreateProfile {
///     account_id,
///     phone_number: Some("+15550100".to_string()),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::account::Account;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Uuid,

    /// Stored path of the profile picture
    pub picture: Option<String>,

    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateProfile {
    pub account_id: Uuid,

    #[validate(length(max = 255))]
    pub picture: Option<String>,

    pub birth_date: Option<NaiveDate>,

    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
}

/// Partial profile update; `Some(None)` clears a field
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(max = 255))]
    pub picture: Option<Option<String>>,

    pub birth_date: Option<Option<NaiveDate>>,

    #[validate(length(max = 15))]
    pub phone_number: Option<Option<String>>,
}

const COLUMNS: &str = "id, account_id, picture, birth_date, phone_number, created_at, updated_at";

impl Profile {
    /// Display form: `"{username} profile"`
    pub fn label(&self, account: &Account) -> String {
        format!("{} profile", account.username)
    }

    /// Creates the profile for an account
    ///
    /// # Errors
    ///
    /// - `Error::Conflict` if the account already has a profile
    /// - `Error::MissingReference` if the account doesn't exist
    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self> {
        data.validate()?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (account_id, picture, birth_date, phone_number) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(data.account_id)
        .bind(data.picture)
        .bind(data.birth_date)
        .bind(data.phone_number)
        .fetch_one(pool)
        .await?;

        info!(account_id = %profile.account_id, "Profile created");
        Ok(profile)
    }

    pub async fn find_by_account(pool: &PgPool, account_id: Uuid) -> Result<Option<Self>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Updates the profile of an account
    ///
    /// # Returns
    ///
    /// The updated profile, or None if the account has no profile
    pub async fn update(
        pool: &PgPool,
        account_id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>> {
        data.validate()?;

        let mut query = String::from("UPDATE profiles SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.picture.is_some() {
            bind_count += 1;
            query.push_str(&format!(", picture = ${}", bind_count));
        }
        if data.birth_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", birth_date = ${}", bind_count));
        }
        if data.phone_number.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone_number = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE account_id = $1 RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Profile>(&query).bind(account_id);

        if let Some(picture) = data.picture {
            q = q.bind(picture);
        }
        if let Some(birth_date) = data.birth_date {
            q = q.bind(birth_date);
        }
        if let Some(phone_number) = data.phone_number {
            q = q.bind(phone_number);
        }

        let profile = q.fetch_optional(pool).await?;

        Ok(profile)
    }

    pub async fn delete(pool: &PgPool, account_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE account_id = $1")
            .bind(account_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
