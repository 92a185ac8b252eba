/// Error type shared by all model operations
///
/// Storage constraint violations are lifted out of `sqlx::Error` so callers can
/// react to them without inspecting driver-specific codes:
///
/// - Unique violations (duplicate username, email, or (account, group) role
///   assignment) become [`Error::Conflict`]
/// - Foreign key violations (unknown account, group, or permission id) become
///   [`Error::MissingReference`]
/// - Foreign key violations raised while deleting a parent row become
///   [`Error::StillReferenced`] (see [`Error::from_delete`])
///
/// Everything else the driver reports stays in [`Error::Database`].
///
/// # Example
///
/// ```no_run
/// use userbase_shared::error::Error;
/// use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, account_id: Uuid, group_id: Uuid) {
/// match GroupRoleAssignment::add_role(&pool, account_id, group_id, Role::Admin).await {
///     Ok(_) => println!("Role assigned"),
///     Err(Error::Conflict { .. }) => println!("Account already has a role in this group"),
///     Err(e) => eprintln!("Failed: {}", e),
/// }
/// # }
/// ```

use crate::auth::password::PasswordError;

/// Result alias used throughout the models
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for userbase operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A unique constraint rejected the write
    #[error("Conflict: {constraint} already taken")]
    Conflict {
        /// Name of the violated constraint (e.g. `accounts_email_key`)
        constraint: String,
    },

    /// A foreign key pointed at a row that does not exist
    #[error("Referenced row does not exist ({constraint})")]
    MissingReference {
        /// Name of the violated constraint
        constraint: String,
    },

    /// A row could not be deleted because other rows still point at it
    #[error("Row is still referenced ({constraint})")]
    StillReferenced {
        /// Name of the violated constraint
        constraint: String,
    },

    /// Input failed validation before reaching the database
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Password hashing or verification failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl Error {
    /// True if this error came from a unique constraint
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Converts an error raised by a `DELETE` of a parent row
    ///
    /// A foreign key violation there means dependents remain, not that a
    /// referenced row is missing.
    pub fn from_delete(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return Error::StillReferenced { constraint };
            }
        }

        err.into()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();

            if db_err.is_unique_violation() {
                return Error::Conflict { constraint };
            }

            if db_err.is_foreign_key_violation() {
                return Error::MissingReference { constraint };
            }
        }

        Error::Database(err)
    }
}
