/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength checks
/// - [`jwt`]: Access/refresh JWT issuance and verification
/// - [`tokens`]: One-shot email tokens and token digests
/// - [`middleware`]: Resolving the caller of a request
/// - [`authorization`]: Project role checks
///
/// # Example
///
/// ```no_run
/// use basecampy_shared::auth::password::{hash_password, verify_password};
/// use basecampy_shared::auth::tokens::generate_temporary_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("S3cure!pass")?;
/// assert!(verify_password("S3cure!pass", &hash)?);
///
/// let verification = generate_temporary_token();
/// // store verification.hash, email verification.token
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;
