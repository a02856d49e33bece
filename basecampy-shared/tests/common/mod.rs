//! Shared helpers for database-backed tests
//!
//! Tests call [`test_pool`] first and return early when `DATABASE_URL` is
//! not set, so the suite passes on machines without PostgreSQL.

#![allow(dead_code)]

use basecampy_shared::db::migrations::run_migrations;
use basecampy_shared::db::pool::{create_pool, DatabaseConfig};
use basecampy_shared::models::project::{CreateProject, Project};
use basecampy_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use uuid::Uuid;

/// Connects to `DATABASE_URL` and applies migrations, or None if unset
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 5,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("DATABASE_URL is set but the database is unreachable");

    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

/// Short random suffix for unique names
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Inserts a user with a random username and email
pub async fn create_user(pool: &PgPool) -> User {
    let username = unique("user");
    User::create(
        pool,
        CreateUser {
            email: format!("{}@example.com", username),
            username,
            full_name: Some("Test User".to_string()),
            password_hash: "$argon2id$v=19$m=65536,t=3,p=4$placeholder".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}

/// Creates a project owned by `owner` with a random name
pub async fn create_project(pool: &PgPool, owner: &User) -> Project {
    Project::create(
        pool,
        CreateProject {
            name: unique("project-"),
            description: Some("test project".to_string()),
            created_by: owner.id,
        },
    )
    .await
    .expect("Failed to create project")
}
