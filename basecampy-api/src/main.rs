//! # Basecampy API Server
//!
//! REST backend for project collaboration: accounts, projects with role-based
//! membership, tasks, subtasks and notes.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/basecampy \
//! ACCESS_TOKEN_SECRET=... REFRESH_TOKEN_SECRET=... \
//! cargo run -p basecampy-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON logs and `RUST_LOG` to override the filter.

use basecampy_api::{
    app::{build_router, AppState},
    config::Config,
};
use basecampy_shared::db::{migrations, pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "basecampy_api=debug,basecampy_shared=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Basecampy API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    migrations::ensure_database_exists(&config.database.url).await?;
    let db = pool::create_pool(config.pool_config()).await?;
    migrations::run_migrations(&db).await?;

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let address = config.bind_address();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
