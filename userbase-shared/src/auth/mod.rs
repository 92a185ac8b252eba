/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`activation`]: account activation code generation and checking
/// - [`authorization`]: activation, group role and permission checks
///
/// # Example
///
/// ```
/// use userbase_shared::auth::activation::generate_activation_code;
/// use userbase_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let code = generate_activation_code(20);
/// assert_eq!(code.len(), 20);
/// # Ok(())
/// # }
/// ```

pub mod activation;
pub mod authorization;
pub mod password;
