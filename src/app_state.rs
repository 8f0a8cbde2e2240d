use std::sync::Arc;

use moka::sync::Cache;

use crate::config::Config;
use crate::db::store::{InMemoryRequestStore, InMemoryUserStore, RequestStore, UserStore};
use crate::lifecycle::{Actor, RequestLifecycle};

/// ✅ **Actor cache keyed by user id, so authenticated calls skip the user lookup**
pub type ActorCache = Cache<String, Actor>;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: RequestLifecycle,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<Config>,
    pub actor_cache: ActorCache,
}

impl AppState {
    pub fn new(config: Config, requests: Arc<dyn RequestStore>, users: Arc<dyn UserStore>) -> Self {
        let actor_cache = Cache::builder()
            .time_to_live(config.actor_cache_ttl)
            .max_capacity(10_000)
            .build();
        Self {
            lifecycle: RequestLifecycle::new(requests),
            users,
            config: Arc::new(config),
            actor_cache,
        }
    }

    /// State backed by process-local stores.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryRequestStore::default()),
            Arc::new(InMemoryUserStore::default()),
        )
    }
}
