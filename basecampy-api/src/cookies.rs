/// Auth cookie handling
///
/// Login and refresh set `accessToken` and `refreshToken` as `HttpOnly`
/// cookies on `/`; logout expires both. `Secure` follows production mode.

use axum::http::{header, HeaderMap, HeaderValue};
use basecampy_shared::auth::jwt::{TokenKeys, TokenPair, TokenType};
use basecampy_shared::auth::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use cookie::{time::Duration, Cookie, SameSite};

use crate::error::{ApiError, ApiResult};

fn build(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn append(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> ApiResult<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// `Set-Cookie` headers carrying a fresh token pair
pub fn set_auth_cookies(tokens: &TokenPair, keys: &TokenKeys, secure: bool) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value, token_type) in [
        (ACCESS_TOKEN_COOKIE, &tokens.access_token, TokenType::Access),
        (REFRESH_TOKEN_COOKIE, &tokens.refresh_token, TokenType::Refresh),
    ] {
        let mut cookie = build(name, value.clone(), secure);
        cookie.set_max_age(Duration::seconds(keys.ttl(token_type).num_seconds()));
        append(&mut headers, &cookie)?;
    }

    Ok(headers)
}

/// `Set-Cookie` headers expiring both auth cookies
pub fn clear_auth_cookies(secure: bool) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        let mut cookie = build(name, String::new(), secure);
        cookie.make_removal();
        append(&mut headers, &cookie)?;
    }

    Ok(headers)
}
