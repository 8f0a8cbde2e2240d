use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::db::queries::requests::*;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/requests/delete", post(purge_requests))
        .route(
            "/api/requests/{id}",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/api/requests/{id}/status", put(update_status))
        .route("/api/requests/{id}/comments", post(add_comment))
        .route("/api/requests/{id}/booking", post(complete_booking))
        .route("/api/requests/{id}/booking/files", put(update_booking_files))
        .route("/api/requests/{id}/fail", post(fail_booking))
}
