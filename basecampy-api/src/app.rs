/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use basecampy_api::{app::AppState, config::Config};
/// use basecampy_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let app = basecampy_api::app::build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, config::IMAGES_PATH, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use basecampy_shared::{
    auth::jwt::TokenKeys,
    mail::{self, LogMailer, MailMessage, Mailer},
    storage::{FileStorage, LocalStorage},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted JSON body
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

/// Largest accepted avatar upload
pub const AVATAR_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Largest accepted task body, attachment files included
pub const TASK_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Access/refresh token keys
    pub token_keys: Arc<TokenKeys>,

    /// Outgoing email
    pub mailer: Arc<dyn Mailer>,

    /// Uploaded files
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    /// Creates state with the log mailer and local upload storage
    pub fn new(db: PgPool, config: Config) -> Self {
        let storage = LocalStorage::new(config.uploads.dir.clone(), config.uploads_base_url());

        Self {
            db,
            token_keys: Arc::new(config.token_keys()),
            config: Arc::new(config),
            mailer: Arc::new(LogMailer),
            storage: Arc::new(storage),
        }
    }

    /// Replaces the mailer
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Replaces the upload storage
    pub fn with_storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Sends an email in the background
    pub fn send_mail(&self, message: MailMessage) {
        mail::dispatch(self.mailer.clone(), message);
    }

    /// Whether cookies carry `Secure`
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /images/*                                  # uploaded files (static)
/// /api/v1
/// ├── GET  /healthcheck
/// ├── /auth
/// │   ├── POST /register, /login, /refresh-token, /forgot-password
/// │   ├── GET  /verify-email/:verification_token
/// │   ├── POST /reset-password/:reset_token
/// │   └── (authenticated) POST /logout, /resend-email-verification,
/// │       /change-password, /avatar; GET /current-user
/// ├── /project                               # authenticated
/// │   ├── GET, POST /
/// │   ├── GET, PUT, DELETE /:project_id
/// │   ├── GET, POST /:project_id/members
/// │   └── PUT, DELETE /:project_id/members/:user_id
/// ├── /task                                  # authenticated
/// │   ├── GET, POST /:project_id               # multipart attachments
/// │   ├── GET, PUT, DELETE /:project_id/t/:task_id  # multipart attachments
/// │   ├── POST /:project_id/t/:task_id/subtasks
/// │   └── PUT, DELETE /:project_id/st/:subtask_id
/// └── /note                                  # authenticated
///     ├── GET, POST /:project_id
///     └── GET, PUT, DELETE /:project_id/n/:note_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS
/// 3. Request tracing
/// 4. Body limit
/// 5. Authentication (per router)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth = || from_fn_with_state(state.clone(), crate::middleware::auth::require_auth);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh-token", post(routes::auth::refresh_token))
        .route("/verify-email/:verification_token", get(routes::auth::verify_email))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:reset_token", post(routes::auth::reset_password));

    let secured_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/current-user", get(routes::auth::current_user))
        .route(
            "/resend-email-verification",
            post(routes::auth::resend_email_verification),
        )
        .route("/change-password", post(routes::auth::change_password))
        .route(
            "/avatar",
            post(routes::auth::update_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route_layer(auth());

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/members",
            get(routes::projects::list_members).post(routes::projects::add_member),
        )
        .route(
            "/:project_id/members/:user_id",
            put(routes::projects::update_member_role).delete(routes::projects::remove_member),
        )
        .route_layer(auth());

    let task_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::tasks::list_tasks)
                .post(routes::tasks::create_task)
                .layer(DefaultBodyLimit::max(TASK_BODY_LIMIT)),
        )
        .route(
            "/:project_id/t/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task)
                .layer(DefaultBodyLimit::max(TASK_BODY_LIMIT)),
        )
        .route(
            "/:project_id/t/:task_id/subtasks",
            post(routes::tasks::create_subtask),
        )
        .route(
            "/:project_id/st/:subtask_id",
            put(routes::tasks::update_subtask).delete(routes::tasks::delete_subtask),
        )
        .route_layer(auth());

    let note_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/:project_id/n/:note_id",
            get(routes::notes::get_note)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .route_layer(auth());

    let v1_routes = Router::new()
        .route("/healthcheck", get(routes::health::health_check))
        .nest("/auth", public_auth_routes.merge(secured_auth_routes))
        .nest("/project", project_routes)
        .nest("/task", task_routes)
        .nest("/note", note_routes);

    Router::new()
        .nest("/api/v1", v1_routes)
        .nest_service(IMAGES_PATH, ServeDir::new(&state.config.uploads.dir))
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive with `*`, otherwise the configured origins with credentials
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
