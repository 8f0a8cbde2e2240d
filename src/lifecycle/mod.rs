//! Request lifecycle core: the status machine, its authorization gate, booking
//! outcomes, owner edits and the comment thread.
//!
//! Every mutating operation is a single [`RequestStore::update`] (or `delete`)
//! call. Authorization, state checks and side effects all run inside the store's
//! lock on that request, against a copy that is discarded if any check fails.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::db::models::travel_request::{
    AuditAction, BookingReceipt, Comment, NewTravelRequest, RequestDetails, RequestFilter,
    RequestStatus, TravelRequest,
};
use crate::db::store::RequestStore;
use crate::utils::ids::{generate_id, REQUEST_PREFIX};

pub mod authz;
pub mod booking;
pub mod comments;
pub mod error;
pub mod machine;
pub mod owner;

pub use authz::Actor;
pub use error::LifecycleError;

#[derive(Clone)]
pub struct RequestLifecycle {
    store: Arc<dyn RequestStore>,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    /// Files a new request owned by `actor`, in SUBMITTED with a single CREATED entry.
    pub async fn create(
        &self,
        actor: &Actor,
        new: NewTravelRequest,
    ) -> Result<TravelRequest, LifecycleError> {
        if actor.id.trim().is_empty() {
            return Err(LifecycleError::Validation("owner id is required".to_string()));
        }
        let kind = new.request_type;
        let details = RequestDetails::from_value(kind, new.data)
            .map_err(|e| LifecycleError::Validation(format!("invalid {kind} payload: {e}")))?;
        owner::validate_details(&details)?;

        let at = machine::now();
        let mut request = TravelRequest {
            id: generate_id(REQUEST_PREFIX),
            owner_id: actor.id.clone(),
            owner_name: actor.name.clone(),
            status: RequestStatus::Submitted,
            details,
            assigned_to: None,
            booking_result: None,
            comments: Vec::new(),
            history: Vec::new(),
            created_at: at,
            updated_at: at,
        };
        machine::record(&mut request, AuditAction::Created, actor, None, at);
        self.store.insert(request).await
    }

    pub async fn get(&self, actor: &Actor, id: &str) -> Result<TravelRequest, LifecycleError> {
        let request = self.store.get(id).await?;
        authz::authorize_read(actor, &request)?;
        Ok(request)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: RequestFilter,
    ) -> Result<Vec<TravelRequest>, LifecycleError> {
        let filter = authz::scope_listing(actor, filter)?;
        self.store.list(&filter).await
    }

    pub async fn transition(
        &self,
        actor: &Actor,
        id: &str,
        target: RequestStatus,
        details: Option<String>,
    ) -> Result<TravelRequest, LifecycleError> {
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_transition(&actor, request, target)?;
                    machine::apply_transition(request, &actor, target, details, machine::now())
                }),
            )
            .await
    }

    pub async fn complete_booking(
        &self,
        actor: &Actor,
        id: &str,
        receipt: BookingReceipt,
    ) -> Result<TravelRequest, LifecycleError> {
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_admin_action(&actor, request, "complete this booking")?;
                    booking::complete(request, &actor, receipt, machine::now())
                }),
            )
            .await
    }

    pub async fn fail_booking(
        &self,
        actor: &Actor,
        id: &str,
        reason: String,
    ) -> Result<TravelRequest, LifecycleError> {
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_admin_action(&actor, request, "fail this booking")?;
                    booking::fail(request, &actor, &reason, machine::now())
                }),
            )
            .await
    }

    pub async fn update_booking_files(
        &self,
        actor: &Actor,
        id: &str,
        files: Vec<String>,
    ) -> Result<TravelRequest, LifecycleError> {
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_admin_action(&actor, request, "update booking files")?;
                    booking::replace_files(request, &actor, files, machine::now())
                }),
            )
            .await
    }

    pub async fn update_request_data(
        &self,
        actor: &Actor,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<TravelRequest, LifecycleError> {
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_owner_mutation(&actor, request, "edit this request")?;
                    owner::apply_update(request, &actor, &patch, machine::now())
                }),
            )
            .await
    }

    /// Hard delete. Nothing of the request survives, its history included.
    pub async fn delete_request(&self, actor: &Actor, id: &str) -> Result<(), LifecycleError> {
        let actor = actor.clone();
        self.store
            .delete(
                id,
                Box::new(move |request| {
                    authz::authorize_owner_mutation(&actor, request, "delete this request")
                }),
            )
            .await
    }

    /// Appends to the thread and returns only the new comment.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: &str,
        content: &str,
    ) -> Result<Comment, LifecycleError> {
        let comment = comments::new_comment(actor, content, machine::now());
        let appended = comment.clone();
        let actor = actor.clone();
        self.store
            .update(
                id,
                Box::new(move |request| {
                    authz::authorize_read(&actor, request)?;
                    comments::append(request, appended)
                }),
            )
            .await?;
        Ok(comment)
    }

    /// Administrative bulk delete. Unknown ids are skipped.
    pub async fn purge(&self, actor: &Actor, ids: &[String]) -> Result<u64, LifecycleError> {
        authz::authorize_purge(actor)?;
        if ids.is_empty() {
            return Err(LifecycleError::Validation("no request ids given".to_string()));
        }
        self.store.delete_many(ids).await
    }
}
