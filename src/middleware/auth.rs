use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::api::auth::Claims;
use crate::app_state::AppState;
use crate::lifecycle::Actor;
use crate::utils::api_response::ApiResponse;

/// ✅ **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        warn!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    let token_str = auth_header.to_str().map_err(|_| {
        warn!("Invalid Authorization header format");
        ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "Invalid Authorization header format", None)
            .into_response()
    })?;

    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid token format (missing 'Bearer ' prefix)");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    debug!(user_id = %token_data.claims.sub, "JWT decoded");
    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// ✅ **Actor Middleware with `moka`**
///
/// Turns the token subject into the [`Actor`] the lifecycle authorizes against.
/// Name and role always come from the user store so a demoted administrator loses
/// access once their cache entry expires.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        error!("Missing JWT claims in request");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing JWT claims in request", None)
            .into_response()
    })?;

    // ✅ **Check cache first before querying the store**
    if let Some(actor) = state.actor_cache.get(&claims.sub) {
        req.extensions_mut().insert(actor);
        return Ok(next.run(req).await);
    }

    let user = match state.users.find_by_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id = %claims.sub, "Token subject no longer exists");
            return Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Unknown user",
                None,
            )
            .into_response());
        }
        Err(err) => {
            error!("User lookup failed: {}", err);
            return Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load user",
                Some(json!({ "error": err.to_string() })),
            )
            .into_response());
        }
    };

    let actor = Actor::new(user.id, user.name, user.role);
    state.actor_cache.insert(claims.sub, actor.clone());

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
