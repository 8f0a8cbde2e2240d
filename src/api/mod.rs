use axum::{http::StatusCode, middleware::from_fn_with_state, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use crate::app_state::AppState;
use crate::db::queries::requests::RequestDoc;
use crate::db::queries::users::UserDoc;
use crate::middleware::auth::{actor_middleware, jwt_middleware};

pub mod auth;
pub mod health;
pub mod requests;
pub mod users;

/// Upper bound for request bodies. Attachments travel as URLs, never inline.
const BODY_LIMIT: usize = 1024 * 1024;

pub fn api_doc() -> utoipa::openapi::OpenApi {
    auth::AuthDoc::openapi()
        .merge_from(RequestDoc::openapi())
        .merge_from(UserDoc::openapi())
}

/// ✅ **Full application router** with public, secured and documentation routes
pub fn app_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .merge(health::health_routes())
        .merge(auth::auth_routes());

    let private_routes = Router::new()
        .merge(requests::request_routes())
        .merge(users::user_routes())
        .route_layer(from_fn_with_state(state.clone(), actor_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", api_doc()).path("/rapidoc"))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
