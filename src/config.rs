use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::Level;

#[derive(Clone, Debug)]
pub struct Config {
    /// `None` runs the service on the in-memory stores.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub token_ttl: Duration,
    pub actor_cache_ttl: Duration,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
    pub log_level: Level,
    pub seed_admin: Option<SeedAdmin>,
}

/// Administrator account created at startup when it does not exist yet.
#[derive(Clone, Debug)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl Config {
    /// Defaults for everything but the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            token_ttl: Duration::from_secs(10 * 60 * 60),
            actor_cache_ttl: Duration::from_secs(600),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            db_max_connections: 10,
            request_timeout: Duration::from_secs(30),
            log_dir: PathBuf::from("logs"),
            log_level: Level::INFO,
            seed_admin: None,
        }
    }

    /// ✅ Load environment variables and fall back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }
        let mut config = Self::new(jwt_secret);

        config.database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if let Some(addr) = parsed::<SocketAddr>("BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(hours) = parsed::<u64>("TOKEN_TTL_HOURS")? {
            config.token_ttl = Duration::from_secs(hours * 60 * 60);
        }
        if let Some(secs) = parsed::<u64>("ACTOR_CACHE_TTL_SECS")? {
            config.actor_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(cost) = parsed::<u32>("BCRYPT_COST")? {
            config.bcrypt_cost = cost;
        }
        if let Some(max) = parsed::<u32>("DB_MAX_CONNECTIONS")? {
            config.db_max_connections = max;
        }
        if let Some(secs) = parsed::<u64>("REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = parsed::<Level>("LOG_LEVEL")? {
            config.log_level = level;
        }

        config.seed_admin = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SeedAdmin { email, password }),
            (Ok(_), Err(_)) => return Err(anyhow!("SEED_ADMIN_PASSWORD must be set with SEED_ADMIN_EMAIL")),
            _ => None,
        };

        Ok(config)
    }
}

fn parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid {key} `{raw}`: {e}")),
        Err(_) => Ok(None),
    }
}
