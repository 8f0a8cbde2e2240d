use serde_json::{json, Value};
use thiserror::Error;

use crate::db::models::travel_request::RequestStatus;
use crate::db::store::StoreError;

/// Every way a lifecycle operation can be refused. A refused operation never
/// leaves a partial write behind.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("travel request `{id}` not found")]
    NotFound { id: String },

    #[error("actor `{actor_id}` is not allowed to {action}")]
    Forbidden { actor_id: String, action: &'static str },

    #[error("cannot {operation} while the request is {status}")]
    InvalidState {
        status: RequestStatus,
        operation: &'static str,
    },

    #[error("cannot move a request from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("the request has no booking result to update")]
    NoBookingResult,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn not_found(id: impl Into<String>) -> Self {
        LifecycleError::NotFound { id: id.into() }
    }

    pub fn forbidden(actor_id: impl Into<String>, action: &'static str) -> Self {
        LifecycleError::Forbidden {
            actor_id: actor_id.into(),
            action,
        }
    }

    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "NOT_FOUND",
            LifecycleError::Forbidden { .. } => "FORBIDDEN",
            LifecycleError::InvalidState { .. } => "INVALID_STATE",
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::Validation(_) => "VALIDATION_ERROR",
            LifecycleError::NoBookingResult => "NO_BOOKING_RESULT",
            LifecycleError::Store(StoreError::Conflict(_)) => "CONFLICT",
            LifecycleError::Store(_) => "STORE_FAILURE",
        }
    }

    /// Kind plus the structured fields of the error.
    pub fn detail(&self) -> Value {
        match self {
            LifecycleError::NotFound { id } => json!({ "kind": self.kind(), "id": id }),
            LifecycleError::Forbidden { actor_id, action } => {
                json!({ "kind": self.kind(), "actorId": actor_id, "action": action })
            }
            LifecycleError::InvalidState { status, operation } => {
                json!({ "kind": self.kind(), "status": status, "operation": operation })
            }
            LifecycleError::InvalidTransition { from, to } => {
                json!({ "kind": self.kind(), "from": from, "to": to })
            }
            LifecycleError::Validation(message) => {
                json!({ "kind": self.kind(), "message": message })
            }
            LifecycleError::NoBookingResult => json!({ "kind": self.kind() }),
            LifecycleError::Store(err) => json!({ "kind": self.kind(), "error": err.to_string() }),
        }
    }
}
