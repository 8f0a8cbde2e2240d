use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::store::StoreError;
use crate::lifecycle::LifecycleError;

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        message: impl Into<String>,
        errors: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            errors,
        }
    }
}

/// ✅ **HTTP status for each lifecycle error kind**
pub fn status_for(err: &LifecycleError) -> StatusCode {
    match err {
        LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
        LifecycleError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LifecycleError::InvalidState { .. }
        | LifecycleError::InvalidTransition { .. }
        | LifecycleError::Validation(_)
        | LifecycleError::NoBookingResult => StatusCode::BAD_REQUEST,
        LifecycleError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LifecycleError> for ApiResponse<()> {
    fn from(err: LifecycleError) -> Self {
        if let LifecycleError::Store(store_err) = &err {
            tracing::error!("❌ Store failure: {}", store_err);
        }
        ApiResponse::error(status_for(&err), err.to_string(), Some(err.detail()))
    }
}

impl From<StoreError> for ApiResponse<()> {
    fn from(err: StoreError) -> Self {
        LifecycleError::from(err).into()
    }
}

impl From<bcrypt::BcryptError> for ApiResponse<()> {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("❌ Password hashing error: {}", err);
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": err.to_string() })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::travel_request::RequestStatus;

    #[test]
    fn lifecycle_errors_map_to_http_statuses() {
        let cases = [
            (LifecycleError::not_found("REQ-1"), StatusCode::NOT_FOUND),
            (LifecycleError::forbidden("u2", "edit this request"), StatusCode::FORBIDDEN),
            (
                LifecycleError::InvalidState {
                    status: RequestStatus::Accepted,
                    operation: "edit",
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                LifecycleError::InvalidTransition {
                    from: RequestStatus::Closed,
                    to: RequestStatus::Accepted,
                },
                StatusCode::BAD_REQUEST,
            ),
            (LifecycleError::NoBookingResult, StatusCode::BAD_REQUEST),
            (LifecycleError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (
                LifecycleError::Store(StoreError::Decode("broken".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{err}");
        }
    }

    #[test]
    fn error_envelope_carries_kind() {
        let response = ApiResponse::<()>::from(LifecycleError::NoBookingResult);
        assert!(!response.success);
        assert_eq!(response.status_code, 400);
        assert_eq!(response.errors.unwrap()["kind"], "NO_BOOKING_RESULT");
    }
}
