use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi, ToSchema};

use crate::app_state::AppState;
use crate::config::Config;
use crate::db::models::user::{Role, User, UserInfo};
use crate::utils::api_response::ApiResponse;
use crate::utils::ids::{generate_id, USER_PREFIX};

/// JWT Claims used for authentication. Name and role are looked up per request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID
    pub sub: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

/// Signs a token for `user` valid for the configured lifetime.
pub fn issue_token(config: &Config, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = Utc::now().timestamp() as usize + config.token_ttl.as_secs() as usize;
    let claims = Claims {
        sub: user.id.clone(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Represents a request to log in
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or user id
    pub identifier: String,
    pub password: String,
}

/// Represents a successful login response returning a jwt token.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Represents a request to register a new user.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Handles user login
///
/// # Returns
/// * `200 OK` - Returns a JWT token and the user profile.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `500 Internal Server Error` - If a store or token generation error occurs.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Authentication",
    request_body(content = LoginRequest, description = "User login details"),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    // Emails are stored lowercased; user ids are matched as given.
    let identifier = match payload.identifier.trim() {
        email if email.contains('@') => email.to_lowercase(),
        id => id.to_string(),
    };
    let user = state.users.find_by_login(&identifier).await?;

    let Some(user) = user else {
        warn!("❌ Login attempt for non-existent user: {}", identifier);
        return Err(invalid_credentials());
    };

    if !verify(&payload.password, &user.password_hash)? {
        warn!("❌ Invalid password attempt for user: {}", identifier);
        return Err(invalid_credentials());
    }

    let token = issue_token(&state.config, &user).map_err(|e| {
        error!("❌ Token generation failed: {}", e);
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    info!("✅ Login successful for user: {}", user.id);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        LoginResponse {
            token,
            user: UserInfo::from(&user),
        },
    ))
}

fn invalid_credentials() -> ApiResponse<()> {
    ApiResponse::error(StatusCode::UNAUTHORIZED, "Invalid email or password", None)
}

/// Handles user registration. New accounts always get the `USER` role.
///
/// # Returns
/// * `201 Created` - If registration is successful.
/// * `400 Bad Request` - If a field is blank.
/// * `409 Conflict` - If the email is already registered.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    tag = "Authentication",
    responses(
        (status = 201, description = "User registered", body = UserInfo),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<UserInfo>, ApiResponse<()>> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Name, email and password are required",
            None,
        ));
    }

    let password_hash = hash(&payload.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .insert(User {
            id: generate_id(USER_PREFIX),
            name: name.to_string(),
            email,
            role: Role::User,
            password_hash,
            created_at: Utc::now(),
        })
        .await?;

    info!("✅ Registered user {}", user.id);
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "User registered",
        UserInfo::from(&user),
    ))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/register", post(register))
}

/// Registers the `bearerAuth` scheme the secured paths refer to.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or_else(Components::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login, register),
    components(schemas(LoginRequest, LoginResponse, RegisterRequest, UserInfo, Role)),
    tags((name = "Authentication", description = "Login and registration")),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::Value;

    #[test]
    fn token_carries_only_subject_and_expiry() {
        let config = Config::new("secret");
        let user = User {
            id: "U-1".into(),
            name: "Wang".into(),
            email: "wang@corp.example".into(),
            role: Role::Admin,
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let token = issue_token(&config, &user).unwrap();

        let decoded = decode::<Value>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        let claims = decoded.claims.as_object().unwrap();
        assert_eq!(claims["sub"], "U-1");
        assert!(claims.contains_key("exp"));
        assert_eq!(claims.len(), 2);
    }
}
