/// JWT access and refresh tokens
///
/// Both token kinds are HS256 JWTs, but each kind is signed with its own
/// secret, so a refresh token can never pass as an access token even before
/// the `token_type` claim is checked.
///
/// | kind    | default lifetime | carried in                              |
/// |---------|------------------|-----------------------------------------|
/// | access  | 1 day            | `accessToken` cookie or Bearer header   |
/// | refresh | 10 days          | `refreshToken` cookie or request body   |
///
/// # Example
///
/// ```
/// use basecampy_shared::auth::jwt::{TokenKeys, TokenType};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = TokenKeys::new(
///     "access-secret-that-is-at-least-32-bytes",
///     "refresh-secret-that-is-at-least-32-bytes",
///     Duration::days(1),
///     Duration::days(10),
/// );
///
/// let user_id = Uuid::new_v4();
/// let pair = keys.issue_pair(user_id)?;
///
/// let claims = keys.verify(&pair.access_token, TokenType::Access)?;
/// assert_eq!(claims.sub, user_id);
/// assert!(keys.verify(&pair.refresh_token, TokenType::Access).is_err());
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "basecampy";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature, issuer or format check failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token is valid but of the other kind
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// `jti` is random per token, so two tokens issued for the same user in the
/// same second still differ. Refresh rotation relies on that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Unique token ID
    pub jti: Uuid,

    /// Token kind
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims valid from now for `expires_in`
    pub fn new(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing keys and lifetimes for both token kinds
#[derive(Clone)]
pub struct TokenKeys {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    fn secret(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.access_secret,
            TokenType::Refresh => &self.refresh_secret,
        }
    }

    /// Lifetime of the given token kind
    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Signs a set of claims with the key matching their token kind
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        let key = EncodingKey::from_secret(self.secret(claims.token_type).as_bytes());

        encode(&Header::new(Algorithm::HS256), claims, &key)
            .map_err(|e| JwtError::CreateError(e.to_string()))
    }

    /// Issues one token of the given kind for a user
    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String, JwtError> {
        self.sign(&Claims::new(user_id, token_type, self.ttl(token_type)))
    }

    /// Issues a fresh access/refresh pair for a user
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenType::Access)?,
            refresh_token: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Verifies a token of the expected kind and returns its claims
    ///
    /// # Errors
    ///
    /// - `JwtError::Expired` past `exp`
    /// - `JwtError::Invalid` for a bad signature, issuer or format
    /// - `JwtError::WrongTokenType` if the claims name the other kind
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let key = DecodingKey::from_secret(self.secret(expected).as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?
            .claims;

        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType {
                expected: expected.as_str(),
                actual: claims.token_type.as_str(),
            });
        }

        Ok(claims)
    }
}
