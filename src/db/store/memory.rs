use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DeleteGuard, Mutation, RequestStore, StoreError, UserStore};
use crate::db::models::travel_request::{RequestFilter, TravelRequest};
use crate::db::models::profile::UserProfile;
use crate::db::models::user::User;
use crate::lifecycle::LifecycleError;

/// Process-local request store. Mutations run under the map's write lock.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<String, TravelRequest>>,
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn get(&self, id: &str) -> Result<TravelRequest, LifecycleError> {
        let requests = self.requests.read().await;
        requests.get(id).cloned().ok_or_else(|| LifecycleError::not_found(id))
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<TravelRequest>, LifecycleError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<TravelRequest> = requests
            .values()
            .filter(|request| {
                filter
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| request.owner_id == owner)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn insert(&self, request: TravelRequest) -> Result<TravelRequest, LifecycleError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(StoreError::Conflict(format!("request `{}` already exists", request.id)).into());
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn update(&self, id: &str, mutation: Mutation) -> Result<TravelRequest, LifecycleError> {
        let mut requests = self.requests.write().await;
        let current = requests.get(id).ok_or_else(|| LifecycleError::not_found(id))?;
        let mut draft = current.clone();
        mutation(&mut draft)?;
        requests.insert(id.to_string(), draft.clone());
        Ok(draft)
    }

    async fn delete(&self, id: &str, guard: DeleteGuard) -> Result<(), LifecycleError> {
        let mut requests = self.requests.write().await;
        let current = requests.get(id).ok_or_else(|| LifecycleError::not_found(id))?;
        guard(current)?;
        requests.remove(id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, LifecycleError> {
        let mut requests = self.requests.write().await;
        let removed = ids.iter().filter(|id| requests.remove(id.as_str()).is_some()).count();
        Ok(removed as u64)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email == identifier || user.id == identifier)
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict(format!("email `{}` is already registered", user.email)));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user `{}` already exists", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn save_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        name: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let mut profiles = self.profiles.write().await;
        if let Some(name) = name {
            if let Some(user) = users.get_mut(user_id) {
                user.name = name.to_string();
            }
        }
        profiles.insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}
