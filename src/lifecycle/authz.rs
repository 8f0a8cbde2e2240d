use serde::{Deserialize, Serialize};

use super::LifecycleError;
use crate::db::models::travel_request::{RequestFilter, RequestStatus, TravelRequest};
use crate::db::models::user::Role;

/// Authenticated identity performing an operation. Resolved by the auth
/// middleware; the lifecycle only authorizes against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// ✅ **Check if actor is an administrator**
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// ✅ **Check if actor created the request**
    pub fn owns(&self, request: &TravelRequest) -> bool {
        self.id == request.owner_id
    }
}

/// Statuses from which the owner may withdraw their own request.
const OWNER_CANCELLABLE: [RequestStatus; 3] = [
    RequestStatus::Submitted,
    RequestStatus::Accepted,
    RequestStatus::InfoNeeded,
];

/// Owner or any administrator.
pub fn authorize_read(actor: &Actor, request: &TravelRequest) -> Result<(), LifecycleError> {
    if actor.is_admin() || actor.owns(request) {
        Ok(())
    } else {
        Err(LifecycleError::forbidden(&actor.id, "view this request"))
    }
}

/// Administrators only, and only the assigned one once the request has been accepted.
pub fn authorize_admin_action(
    actor: &Actor,
    request: &TravelRequest,
    action: &'static str,
) -> Result<(), LifecycleError> {
    if !actor.is_admin() {
        return Err(LifecycleError::forbidden(&actor.id, action));
    }
    match request.assigned_to.as_deref() {
        Some(assignee) if assignee != actor.id => Err(LifecycleError::forbidden(&actor.id, action)),
        _ => Ok(()),
    }
}

/// Administrative transitions go through [`authorize_admin_action`]; the owner may
/// additionally cancel while nobody has started booking.
pub fn authorize_transition(
    actor: &Actor,
    request: &TravelRequest,
    target: RequestStatus,
) -> Result<(), LifecycleError> {
    match authorize_admin_action(actor, request, "change the status of this request") {
        Ok(()) => Ok(()),
        Err(_) if actor.owns(request) && target == RequestStatus::Cancelled => {
            if OWNER_CANCELLABLE.contains(&request.status) {
                Ok(())
            } else {
                Err(LifecycleError::InvalidState {
                    status: request.status,
                    operation: "cancel",
                })
            }
        }
        Err(err) => Err(err),
    }
}

/// Edits and deletes belong to the owner, and only while the request is still open for input.
pub fn authorize_owner_mutation(
    actor: &Actor,
    request: &TravelRequest,
    operation: &'static str,
) -> Result<(), LifecycleError> {
    if !actor.owns(request) {
        return Err(LifecycleError::forbidden(&actor.id, operation));
    }
    if !request.status.is_owner_editable() {
        return Err(LifecycleError::InvalidState {
            status: request.status,
            operation,
        });
    }
    Ok(())
}

pub fn authorize_purge(actor: &Actor) -> Result<(), LifecycleError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LifecycleError::forbidden(&actor.id, "bulk delete requests"))
    }
}

/// A traveller profile belongs to its user; administrators may manage any of them.
pub fn authorize_profile(
    actor: &Actor,
    user_id: &str,
    action: &'static str,
) -> Result<(), LifecycleError> {
    if actor.is_admin() || actor.id == user_id {
        Ok(())
    } else {
        Err(LifecycleError::forbidden(&actor.id, action))
    }
}

/// Narrows a listing to what the actor may see.
pub fn scope_listing(actor: &Actor, filter: RequestFilter) -> Result<RequestFilter, LifecycleError> {
    if actor.is_admin() {
        return Ok(filter);
    }
    match filter.owner_id {
        Some(owner) if owner != actor.id => {
            Err(LifecycleError::forbidden(&actor.id, "list another user's requests"))
        }
        _ => Ok(RequestFilter {
            owner_id: Some(actor.id.clone()),
        }),
    }
}
