/// Middleware for the API server
///
/// - `auth`: access token authentication
/// - `security`: security response headers

pub mod auth;
pub mod security;
