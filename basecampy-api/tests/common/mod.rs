//! Common test utilities for API integration tests
//!
//! - [`offline_app`] builds the router over a lazy pool that never connects,
//!   for tests that stop before touching the database
//! - [`TestContext`] builds it over `DATABASE_URL` with an in-memory mailer,
//!   and is None when the variable is not set
//! - [`send`] drives the router with one request and decodes the JSON body

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use basecampy_api::app::{build_router, AppState};
use basecampy_api::config::Config;
use basecampy_shared::auth::jwt::TokenType;
use basecampy_shared::auth::password::hash_password;
use basecampy_shared::db::migrations::run_migrations;
use basecampy_shared::db::pool::{create_lazy_pool, create_pool, DatabaseConfig};
use basecampy_shared::mail::{MailMessage, MemoryMailer};
use basecampy_shared::models::user::{CreateUser, User};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

/// Password every test user gets
pub const PASSWORD: &str = "Str0ng!Passw0rd";

/// Configuration for tests, pointing uploads at a scratch directory
pub fn test_config(database_url: &str) -> Config {
    let upload_dir: PathBuf = std::env::temp_dir().join(format!("basecampy-uploads-{}", Uuid::new_v4()));

    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("ACCESS_TOKEN_SECRET", "test-access-secret-at-least-32-bytes!".to_string()),
        ("REFRESH_TOKEN_SECRET", "test-refresh-secret-at-least-32-bytes".to_string()),
        ("UPLOAD_DIR", upload_dir.to_string_lossy().into_owned()),
    ]);

    Config::from_lookup(|name| vars.get(name).cloned()).expect("test config should load")
}

/// Router over a pool that fails fast on first use
pub fn offline_app() -> Router {
    let config = test_config("postgresql://nobody@127.0.0.1:1/basecampy");

    let pool = create_lazy_pool(&DatabaseConfig {
        url: config.database.url.clone(),
        min_connections: 0,
        acquire_timeout: Duration::from_secs(1),
        ..Default::default()
    })
    .expect("lazy pool should build");

    build_router(AppState::new(pool, config))
}

/// Test context over a real database
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub state: AppState,
    pub mailer: MemoryMailer,
}

impl TestContext {
    /// Connects to `DATABASE_URL` and applies migrations, or None if unset
    pub async fn new() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = test_config(&url);

        let db = create_pool(DatabaseConfig {
            max_connections: 5,
            min_connections: 1,
            ..config.pool_config()
        })
        .await
        .expect("DATABASE_URL is set but the database is unreachable");
        run_migrations(&db).await.expect("Failed to run migrations");

        let mailer = MemoryMailer::new();
        let state = AppState::new(db.clone(), config).with_mailer(Arc::new(mailer.clone()));
        let app = build_router(state.clone());

        Some(Self {
            db,
            app,
            state,
            mailer,
        })
    }

    /// Inserts a user with [`PASSWORD`] and returns it with an access token
    pub async fn user(&self) -> (User, String) {
        let username = unique("user");
        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("{}@example.com", username),
                username,
                full_name: None,
                password_hash: hash_password(PASSWORD).expect("hash"),
            },
        )
        .await
        .expect("Failed to create user");

        let token = self
            .state
            .token_keys
            .issue(user.id, TokenType::Access)
            .expect("token");

        (user, token)
    }

    /// Sends one request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        send(&self.app, method, uri, token, body).await
    }

    /// Waits until the mailer has recorded `count` messages
    pub async fn wait_for_mail(&self, count: usize) -> Vec<MailMessage> {
        let mailer = self.mailer.clone();
        wait_for(move || {
            let mailer = mailer.clone();
            async move { mailer.sent_messages().len() >= count }
        }, 5)
        .await
        .expect("mail was not sent");

        self.mailer.sent_messages()
    }
}

/// One file part of a multipart request
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub mimetype: &'a str,
    pub content: &'a [u8],
}

const BOUNDARY: &str = "basecampy-test-boundary";

/// Builds a `multipart/form-data` body from text fields and files
pub fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    for file in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file.field, file.file_name, file.mimetype
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Sends a multipart request through a router and decodes the JSON body
pub async fn send_multipart(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    files: &[FilePart<'_>],
) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(fields, files)))
        .unwrap();

    into_test_response(app.clone().oneshot(request).await.unwrap()).await
}

/// Decoded response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Set-Cookie` values, as sent
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Value of one cookie set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies().into_iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
    }
}

/// Sends one request through a router and decodes the JSON body
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    into_test_response(app.clone().oneshot(request).await.unwrap()).await
}

async fn into_test_response(response: axum::response::Response) -> TestResponse {
    let status = response.status();
    let headers = response.headers().clone();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Short random suffix for unique names
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Last path segment of the link in an email body
pub fn token_from_mail(message: &MailMessage) -> String {
    message
        .text
        .lines()
        .find_map(|line| line.split_once(": http").map(|(_, url)| url.to_string()))
        .and_then(|url| url.rsplit('/').next().map(str::to_string))
        .expect("mail should carry a link")
}

/// Helper to wait for condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(timeout_secs);

    loop {
        if condition().await {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
