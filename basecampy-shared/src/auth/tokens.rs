/// One-shot tokens for email verification and password reset
///
/// The plaintext token goes to the user by email. Only its SHA-256 digest is
/// stored, alongside an expiry 20 minutes out. The same digest function is
/// used for refresh tokens, which are also stored hashed.
///
/// # Example
///
/// ```
/// use basecampy_shared::auth::tokens::{generate_temporary_token, hash_token};
///
/// let issued = generate_temporary_token();
/// assert_eq!(issued.token.len(), 40);
/// assert_eq!(hash_token(&issued.token), issued.hash);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (hex-encoded to twice as many characters)
const TOKEN_BYTES: usize = 20;

/// How long a temporary token stays valid
pub const TEMPORARY_TOKEN_TTL_MINUTES: i64 = 20;

/// A freshly issued temporary token
#[derive(Debug, Clone)]
pub struct TemporaryToken {
    /// Plaintext token sent to the user
    pub token: String,

    /// SHA-256 hex digest stored in the database
    pub hash: String,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Generates a temporary token with its digest and expiry
pub fn generate_temporary_token() -> TemporaryToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_token(&token);

    TemporaryToken {
        token,
        hash,
        expires_at: Utc::now() + Duration::minutes(TEMPORARY_TOKEN_TTL_MINUTES),
    }
}

/// SHA-256 hex digest of a token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Checks the shape of a temporary token before touching the database
pub fn is_temporary_token_format(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Compares a presented token with a stored digest in constant time
pub fn matches_hash(token: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_token(token), stored_hash)
}

/// Constant-time string comparison
///
/// Length is not secret here: both sides are fixed-length digests.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
