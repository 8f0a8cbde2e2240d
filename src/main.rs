use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use travel_desk::api::app_routes;
use travel_desk::app_state::AppState;
use travel_desk::config::Config;
use travel_desk::db::models::user::{Role, User};
use travel_desk::db::pool::{ensure_schema, get_db_pool};
use travel_desk::db::store::{PgRequestStore, PgUserStore};
use travel_desk::utils::ids::{generate_id, USER_PREFIX};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "travel_desk.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking.and(std::io::stdout))
        .init();

    let (state, pool) = match config.database_url.clone() {
        Some(database_url) => {
            let pool = get_db_pool(&config, &database_url)
                .await
                .context("Failed to connect to the database")?;
            ensure_schema(&pool).await.context("Failed to prepare the schema")?;
            let state = AppState::new(
                config,
                Arc::new(PgRequestStore::new(pool.clone())),
                Arc::new(PgUserStore::new(pool.clone())),
            );
            (state, Some(pool))
        }
        None => {
            warn!("⚠️ DATABASE_URL not set, data lives in memory and is lost on exit");
            (AppState::in_memory(config), None)
        }
    };

    seed_admin(&state).await?;

    let addr = state.config.bind_addr;
    let app = app_routes(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server encountered an error")?;

    if let Some(pool) = pool {
        info!("🛠️ Closing database pool...");
        pool.close().await;
    }
    info!("✅ Shutdown complete.");
    Ok(())
}

/// Creates the bootstrap administrator on first start.
async fn seed_admin(state: &AppState) -> anyhow::Result<()> {
    let Some(seed) = state.config.seed_admin.clone() else {
        return Ok(());
    };
    let email = seed.email.trim().to_lowercase();
    if state.users.find_by_login(&email).await?.is_some() {
        return Ok(());
    }

    let password_hash = bcrypt::hash(&seed.password, state.config.bcrypt_cost)?;
    let admin = state
        .users
        .insert(User {
            id: generate_id(USER_PREFIX),
            name: "Administrator".to_string(),
            email,
            role: Role::Admin,
            password_hash,
            created_at: Utc::now(),
        })
        .await?;
    info!("👤 Seeded administrator {} ({})", admin.email, admin.id);
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(err) => {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
