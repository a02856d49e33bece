/// Request authentication
///
/// Resolves the caller of a request from its access token and turns it into
/// an [`AuthContext`]. The API server's middleware inserts that context into
/// request extensions, and handlers take it with `Extension<AuthContext>`.
///
/// The access token is read from the `accessToken` cookie first, then from an
/// `Authorization: Bearer` header.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use basecampy_shared::auth::jwt::TokenKeys;
/// use basecampy_shared::auth::middleware::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, keys: TokenKeys, headers: HeaderMap) {
/// match authenticate(&pool, &keys, &headers).await {
///     Ok(ctx) => println!("request from {}", ctx.user_id),
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{JwtError, TokenKeys, TokenType};
use crate::models::user::User;

/// Cookie holding the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// The authenticated caller of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Username at authentication time
    pub username: String,

    /// Email at authentication time
    pub email: String,

    /// Whether the user's email is verified
    pub email_verified: bool,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
        }
    }
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in cookie or header
    #[error("Unauthorized request")]
    MissingCredentials,

    /// Token failed verification
    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] JwtError),

    /// Token is valid but its user is gone
    #[error("Invalid access token")]
    UnknownUser,

    /// Database lookup failed
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Reads a cookie by name from every `Cookie` header of a request
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads the access token from the `accessToken` cookie or a Bearer header
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = read_cookie(headers, ACCESS_TOKEN_COOKIE) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` without a token
/// - `AuthError::InvalidToken` if the token fails verification
/// - `AuthError::UnknownUser` if the token's user no longer exists
/// - `AuthError::DatabaseError` if the user lookup fails
pub async fn authenticate(
    pool: &PgPool,
    keys: &TokenKeys,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = extract_access_token(headers).ok_or(AuthError::MissingCredentials)?;
    let claims = keys.verify(&token, TokenType::Access)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user))
}
