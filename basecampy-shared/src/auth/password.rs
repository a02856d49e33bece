/// Password hashing with Argon2id
///
/// Hashes are PHC strings carrying their own parameters and salt, so
/// verification never needs the parameters below.
///
/// | parameter   | value   |
/// |-------------|---------|
/// | memory      | 64 MiB  |
/// | iterations  | 3       |
/// | parallelism | 4       |
/// | output      | 32 bytes|
///
/// # Example
///
/// ```
/// use basecampy_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Corr3ct!Horse")?;
/// assert!(verify_password("Corr3ct!Horse", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

const MEMORY_KIB: u32 = 65536;
const ITERATIONS: u32 = 3;
const PARALLELISM: u32 = 4;
const OUTPUT_LEN: usize = 32;

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash
///
/// # Returns
///
/// `Ok(false)` for a wrong password; errors are reserved for unusable hashes
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks that a new password is strong enough to store
///
/// Requires at least [`MIN_PASSWORD_LEN`] characters with an uppercase
/// letter, a lowercase letter, a digit and a symbol.
///
/// # Returns
///
/// The first unmet requirement as a user-facing message
///
/// # Example
///
/// ```
/// use basecampy_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("MyP@ssw0rd!").is_ok());
/// assert!(validate_password_strength("password").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    let checks: [(bool, &'static str); 5] = [
        (
            password.chars().count() >= MIN_PASSWORD_LEN,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(char::is_uppercase),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(char::is_lowercase),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(char::is_numeric),
            "Password must contain at least one digit",
        ),
        (
            password.chars().any(|c| !c.is_alphanumeric()),
            "Password must contain at least one special character",
        ),
    ];

    match checks.into_iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(message),
        None => Ok(()),
    }
}
