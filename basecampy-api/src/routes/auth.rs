/// Authentication endpoints
///
/// Account lifecycle: registration with email verification, login with an
/// access/refresh token pair, refresh-token rotation, password reset and
/// change, and avatar upload.
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register a new user
/// - `POST /api/v1/auth/login` - Login and get tokens
/// - `POST /api/v1/auth/logout` - Drop the refresh token and cookies
/// - `GET  /api/v1/auth/current-user` - The caller's profile
/// - `GET  /api/v1/auth/verify-email/:verification_token` - Confirm an email address
/// - `POST /api/v1/auth/resend-email-verification` - Send a new verification link
/// - `POST /api/v1/auth/refresh-token` - Rotate the token pair
/// - `POST /api/v1/auth/forgot-password` - Send a password reset link
/// - `POST /api/v1/auth/reset-password/:reset_token` - Set a new password with a reset token
/// - `POST /api/v1/auth/change-password` - Set a new password with the old one
/// - `POST /api/v1/auth/avatar` - Upload an avatar (multipart field `avatar`)

use crate::{
    app::AppState,
    cookies,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    response::ApiResponse,
};
use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Extension, Json,
};
use basecampy_shared::{
    auth::{
        jwt::{TokenPair, TokenType},
        middleware::{read_cookie, AuthContext, REFRESH_TOKEN_COOKIE},
        password,
        tokens,
    },
    mail,
    models::user::{Avatar, CreateUser, User, UserProfile},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    /// Must already be lowercase
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,

    /// Checked for strength after field validation
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default, alias = "fullName")]
    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request; the cookie takes precedence
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Forgot password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(alias = "newPassword")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub new_password: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(alias = "oldPassword")]
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[serde(alias = "newPassword")]
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Registered user
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserProfile,
}

/// Logged-in user with its tokens
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Email verification result
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub email_verified: bool,
}

/// Uploaded avatar
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: Avatar,
}

fn check_password_strength(field: &str, password: &str) -> ApiResult<()> {
    password::validate_password_strength(password).map_err(|msg| ApiError::invalid_field(field, msg))
}

fn invalid_token() -> ApiError {
    ApiError::BadRequest("Token is invalid or expired".to_string())
}

/// Loads the authenticated caller's full record
async fn caller(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))
}

/// Issues a verification token for a user and mails the link
async fn send_verification(state: &AppState, user: &User) -> ApiResult<()> {
    let token = tokens::generate_temporary_token();
    User::set_email_verification_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    state.send_mail(mail::email_verification_message(
        &user.email,
        &user.username,
        &state.config.email_verification_url(&token.token),
    ));

    Ok(())
}

/// Issues a token pair and stores the refresh token digest
async fn issue_session(state: &AppState, user_id: uuid::Uuid) -> ApiResult<(TokenPair, HeaderMap)> {
    let pair = state.token_keys.issue_pair(user_id)?;
    User::set_refresh_token_hash(&state.db, user_id, Some(&tokens::hash_token(&pair.refresh_token)))
        .await?;

    let headers = cookies::set_auth_cookies(&pair, &state.token_keys, state.secure_cookies())?;
    Ok((pair, headers))
}

/// Register a new user
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Username or email already taken
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<RegisterResponse>> {
    if req.username.trim() != req.username.trim().to_lowercase() {
        return Err(ApiError::invalid_field("username", "Username must be in lower case"));
    }
    check_password_strength("password", &req.password)?;

    if User::exists_by_username_or_email(&state.db, &req.username, &req.email).await? {
        return Err(ApiError::Conflict(
            "User with email or username already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            full_name: req.full_name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty()),
            password_hash,
        },
    )
    .await?;

    send_verification(&state, &user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(
        RegisterResponse {
            user: user.profile(),
        },
        "User registered successfully and verification email has been sent on your email",
    ))
}

/// Login with email and password
///
/// Sets `accessToken` and `refreshToken` cookies and also returns both
/// tokens in the body.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<(HeaderMap, ApiResponse<LoginResponse>)> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let (pair, headers) = issue_session(&state, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        headers,
        ApiResponse::ok(
            LoginResponse {
                user: user.profile(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Logout: forget the refresh token and clear both cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<(HeaderMap, ApiResponse<Value>)> {
    User::set_refresh_token_hash(&state.db, auth.user_id, None).await?;

    let headers = cookies::clear_auth_cookies(state.secure_cookies())?;
    Ok((headers, ApiResponse::ok(json!({}), "User logged out")))
}

/// The caller's sanitized profile
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let user = caller(&state, &auth).await?;
    Ok(ApiResponse::ok(user.profile(), "Current user fetched successfully"))
}

/// Confirms an email address from the emailed link
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown, already used or expired
pub async fn verify_email(
    State(state): State<AppState>,
    Path(verification_token): Path<String>,
) -> ApiResult<ApiResponse<VerifyEmailResponse>> {
    if !tokens::is_temporary_token_format(&verification_token) {
        return Err(invalid_token());
    }

    let user = User::verify_email(&state.db, &tokens::hash_token(&verification_token))
        .await?
        .ok_or_else(invalid_token)?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(ApiResponse::ok(
        VerifyEmailResponse {
            email_verified: user.email_verified,
        },
        "Email is verified",
    ))
}

/// Sends a fresh verification link
///
/// # Errors
///
/// - `409 Conflict`: Email already verified
pub async fn resend_email_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Value>> {
    let user = caller(&state, &auth).await?;

    if user.email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    send_verification(&state, &user).await?;

    Ok(ApiResponse::ok(json!({}), "Mail has been sent to your email ID"))
}

/// Rotates the token pair
///
/// The refresh token comes from the `refreshToken` cookie or the body. It
/// must verify and match the one stored for the user; a used token is
/// rejected.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, expired or superseded token
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(HeaderMap, ApiResponse<TokenPair>)> {
    let incoming = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".to_string()))?;

    let invalid = || ApiError::Unauthorized("Invalid refresh token".to_string());

    let claims = state
        .token_keys
        .verify(&incoming, TokenType::Refresh)
        .map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            invalid()
        })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(invalid)?;

    let current = user.refresh_token_hash.as_deref().unwrap_or_default();
    if !tokens::matches_hash(&incoming, current) {
        tracing::warn!(user_id = %user.id, "Superseded refresh token presented");
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let (pair, headers) = issue_session(&state, user.id).await?;

    Ok((headers, ApiResponse::ok(pair, "Access token refreshed")))
}

/// Mails a password reset link
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let token = tokens::generate_temporary_token();
    User::set_forgot_password_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    state.send_mail(mail::password_reset_message(
        &user.email,
        &user.username,
        &state.config.password_reset_url(&token.token),
    ));

    Ok(ApiResponse::ok(
        json!({}),
        "Password reset mail has been sent on your mail id",
    ))
}

/// Sets a new password with a reset token
///
/// Also drops the stored refresh token, ending existing sessions.
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown, already used or expired
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    check_password_strength("new_password", &req.new_password)?;

    if !tokens::is_temporary_token_format(&reset_token) {
        return Err(invalid_token());
    }

    let password_hash = password::hash_password(&req.new_password)?;

    let user = User::reset_password(&state.db, &tokens::hash_token(&reset_token), &password_hash)
        .await?
        .ok_or_else(invalid_token)?;

    User::set_refresh_token_hash(&state.db, user.id, None).await?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(ApiResponse::ok(json!({}), "Password reset successfully"))
}

/// Sets a new password after checking the old one
///
/// # Errors
///
/// - `400 Bad Request`: Old password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let user = caller(&state, &auth).await?;

    if !password::verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Invalid old password".to_string()));
    }

    check_password_strength("new_password", &req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// Stores an uploaded avatar and points the user at it
///
/// The previous avatar file, if any, is removed afterwards.
///
/// # Errors
///
/// - `400 Bad Request`: No `avatar` field or an empty file
/// - `422 Unprocessable Entity`: The file is not an image
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<ApiResponse<AvatarResponse>> {
    let user = caller(&state, &auth).await?;

    let mut stored = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("avatar").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        if !mimetype.starts_with("image/") {
            return Err(ApiError::invalid_field("avatar", "Avatar must be an image"));
        }

        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if content.is_empty() {
            return Err(ApiError::BadRequest("Avatar file is empty".to_string()));
        }

        stored = Some(state.storage.store(&file_name, &mimetype, content).await?);
        break;
    }

    let stored = stored.ok_or_else(|| ApiError::BadRequest("No avatar file uploaded".to_string()))?;

    let avatar = Avatar {
        url: stored.url,
        local_path: stored.local_path,
    };

    let updated = User::update_avatar(&state.db, user.id, &avatar)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;

    if !user.avatar_local_path.is_empty() {
        if let Err(e) = state.storage.remove(&user.avatar_local_path).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to remove previous avatar");
        }
    }

    tracing::info!(user_id = %user.id, size = stored.size, "Avatar updated");

    Ok(ApiResponse::ok(
        AvatarResponse {
            avatar: updated.avatar(),
        },
        "Avatar uploaded successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "alice@example.com",
            "username": "alice",
            "password": "Sup3r$ecret",
            "fullName": "Alice A."
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.full_name.as_deref(), Some("Alice A."));

        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "nope",
            "username": "al",
            "password": ""
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_refresh_request_accepts_camel_case() {
        let req: RefreshRequest = serde_json::from_value(json!({"refreshToken": "abc"})).unwrap();
        assert_eq!(req.refresh_token.as_deref(), Some("abc"));

        let req: RefreshRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.refresh_token.is_none());
    }

    #[test]
    fn test_password_strength_is_field_error() {
        match check_password_strength("new_password", "weak") {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "new_password");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(check_password_strength("password", "Str0ng!Pass").is_ok());
    }
}
