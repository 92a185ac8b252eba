/// Account activation codes
///
/// New accounts start inactive. An activation code is a short random token
/// stored on the account (`accounts.activation_code`) and handed to the user
/// out of band; presenting it back activates the account.
///
/// # Format
///
/// Base62 characters (`[A-Za-z0-9]`), between [`MIN_CODE_LENGTH`] and
/// [`MAX_CODE_LENGTH`] long. The column holds at most 20 characters.
///
/// # Example
///
/// ```
/// use userbase_shared::auth::activation::{generate_activation_code, validate_code_format};
///
/// let code = generate_activation_code(20);
/// assert_eq!(code.len(), 20);
/// assert!(validate_code_format(&code));
/// ```

use rand::Rng;

/// Shortest code `generate_activation_code` will produce
pub const MIN_CODE_LENGTH: usize = 8;

/// Longest code the `activation_code` column can hold
pub const MAX_CODE_LENGTH: usize = 20;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random activation code
///
/// `length` is clamped to `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
pub fn generate_activation_code(length: usize) -> String {
    let length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Checks the shape of a code before it is compared against storage
pub fn validate_code_format(code: &str) -> bool {
    (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Compares a presented code with the stored one in constant time
pub fn codes_match(presented: &str, stored: &str) -> bool {
    if presented.len() != stored.len() {
        return false;
    }

    presented
        .bytes()
        .zip(stored.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
