use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::travel_request::{RequestFilter, TravelRequest};
use crate::db::models::profile::UserProfile;
use crate::db::models::user::User;
use crate::lifecycle::LifecycleError;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryRequestStore, InMemoryUserStore};
pub use postgres::{PgRequestStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Applied to a private copy of the stored request. The copy is written back
/// only when the closure returns `Ok`.
pub type Mutation = Box<dyn FnOnce(&mut TravelRequest) -> Result<(), LifecycleError> + Send>;

/// Inspects the stored request before it is removed; an `Err` cancels the delete.
pub type DeleteGuard = Box<dyn FnOnce(&TravelRequest) -> Result<(), LifecycleError> + Send>;

/// Persistence for travel requests.
///
/// `update` and `delete` hold an exclusive lock on the entity for the whole
/// read-check-write, so concurrent callers on the same id are serialized and
/// appends to `history` or `comments` are never lost.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<TravelRequest, LifecycleError>;

    /// Newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<TravelRequest>, LifecycleError>;

    async fn insert(&self, request: TravelRequest) -> Result<TravelRequest, LifecycleError>;

    async fn update(&self, id: &str, mutation: Mutation) -> Result<TravelRequest, LifecycleError>;

    async fn delete(&self, id: &str, guard: DeleteGuard) -> Result<(), LifecycleError>;

    /// Removes every listed id that exists and reports how many were removed.
    async fn delete_many(&self, ids: &[String]) -> Result<u64, LifecycleError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Matches either the email or the id, the way the login form accepts both.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Replaces the stored profile and, when `name` is given, renames the account
    /// in the same write.
    async fn save_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        name: Option<&str>,
    ) -> Result<(), StoreError>;
}
