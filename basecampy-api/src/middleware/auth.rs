/// Authentication middleware
///
/// Resolves the caller from the `accessToken` cookie or a Bearer header and
/// inserts an [`AuthContext`] into the request extensions. Handlers behind it
/// take `Extension<AuthContext>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use basecampy_shared::auth::middleware::{authenticate, AuthContext};

use crate::{app::AppState, error::ApiError};

/// Rejects unauthenticated requests with 401
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate(&state.db, &state.token_keys, req.headers()).await?;

    tracing::trace!(user_id = %auth.user_id, "Request authenticated");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
