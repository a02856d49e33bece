/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first when present.
///
/// # Environment Variables
///
/// | variable                       | default                  |
/// |--------------------------------|--------------------------|
/// | `API_HOST`                     | `0.0.0.0`                |
/// | `API_PORT`                     | `8080`                   |
/// | `API_PRODUCTION`               | `false`                  |
/// | `CORS_ORIGINS`                 | `http://localhost:5173`  |
/// | `SERVER_URL`                   | `http://localhost:8080`  |
/// | `DATABASE_URL`                 | required                 |
/// | `DATABASE_MAX_CONNECTIONS`     | `10`                     |
/// | `ACCESS_TOKEN_SECRET`          | required, 32+ chars      |
/// | `REFRESH_TOKEN_SECRET`         | required, 32+ chars      |
/// | `ACCESS_TOKEN_EXPIRY_MINUTES`  | `1440`                   |
/// | `REFRESH_TOKEN_EXPIRY_DAYS`    | `10`                     |
/// | `FORGOT_PASSWORD_REDIRECT_URL` | `http://localhost:5173/reset-password` |
/// | `UPLOAD_DIR`                   | `public/images`          |
///
/// # Example
///
/// ```no_run
/// use basecampy_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("listening on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;

use basecampy_shared::auth::jwt::TokenKeys;
use basecampy_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Shortest accepted token signing secret
const MIN_SECRET_LEN: usize = 32;

/// URL path uploaded files are served under
pub const IMAGES_PATH: &str = "/images";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS and `Secure` cookies
    pub production: bool,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Public base URL of this server, used in emailed links
    pub server_url: String,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Token settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,

    /// Frontend page that receives password reset tokens
    pub forgot_password_redirect_url: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_expiry_minutes", &self.access_token_expiry_minutes)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .field("forgot_password_redirect_url", &self.forgot_password_redirect_url)
            .finish_non_exhaustive()
    }
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded files are written to and served from
    pub dir: PathBuf,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

fn required_secret(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<String> {
    let secret = lookup(name)
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))?;

    if secret.len() < MIN_SECRET_LEN {
        anyhow::bail!("{} must be at least {} characters long", name, MIN_SECRET_LEN);
    }

    Ok(secret)
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a secret is too
    /// short, or a value fails to parse
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let cors_origins = get("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let access_token_expiry_minutes: i64 = parse_var(&lookup, "ACCESS_TOKEN_EXPIRY_MINUTES", 1440)?;
        let refresh_token_expiry_days: i64 = parse_var(&lookup, "REFRESH_TOKEN_EXPIRY_DAYS", 10)?;
        if access_token_expiry_minutes <= 0 || refresh_token_expiry_days <= 0 {
            anyhow::bail!("Token expiry values must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST", "0.0.0.0"),
                port: parse_var(&lookup, "API_PORT", 8080)?,
                production: parse_var(&lookup, "API_PRODUCTION", false)?,
                cors_origins,
                server_url: get("SERVER_URL", "http://localhost:8080")
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthConfig {
                access_token_secret: required_secret(&lookup, "ACCESS_TOKEN_SECRET")?,
                refresh_token_secret: required_secret(&lookup, "REFRESH_TOKEN_SECRET")?,
                access_token_expiry_minutes,
                refresh_token_expiry_days,
                forgot_password_redirect_url: get(
                    "FORGOT_PASSWORD_REDIRECT_URL",
                    "http://localhost:5173/reset-password",
                )
                .trim_end_matches('/')
                .to_string(),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(get("UPLOAD_DIR", "public/images")),
            },
        })
    }

    /// Gets the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds the token signing keys
    pub fn token_keys(&self) -> TokenKeys {
        TokenKeys::new(
            self.auth.access_token_secret.clone(),
            self.auth.refresh_token_secret.clone(),
            chrono::Duration::minutes(self.auth.access_token_expiry_minutes),
            chrono::Duration::days(self.auth.refresh_token_expiry_days),
        )
    }

    /// Builds the connection pool settings
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }

    /// Public URL prefix of uploaded files
    pub fn uploads_base_url(&self) -> String {
        format!("{}{}", self.api.server_url, IMAGES_PATH)
    }

    /// Link sent in the verification email
    pub fn email_verification_url(&self, token: &str) -> String {
        format!("{}/api/v1/auth/verify-email/{}", self.api.server_url, token)
    }

    /// Link sent in the password reset email
    pub fn password_reset_url(&self, token: &str) -> String {
        format!("{}/{}", self.auth.forgot_password_redirect_url, token)
    }
}
