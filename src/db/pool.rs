use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT UNIQUE NOT NULL,
    role          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS travel_requests (
    id             TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES users(id),
    user_name      TEXT NOT NULL,
    request_type   TEXT NOT NULL,
    status         TEXT NOT NULL,
    data           JSONB NOT NULL,
    comments       JSONB NOT NULL DEFAULT '[]'::jsonb,
    history        JSONB NOT NULL DEFAULT '[]'::jsonb,
    booking_result JSONB,
    assigned_to    TEXT,
    created_at     TIMESTAMPTZ NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id    TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    data       JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS travel_requests_owner_created_idx
    ON travel_requests (user_id, created_at DESC);
"#;

/// Connect with the pool limits from the config.
pub async fn get_db_pool(config: &Config, database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
}

/// ✅ Creates any missing tables. Safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
