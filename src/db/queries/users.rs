use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::profile::{Gender, IdentityDocument, UserProfile};
use crate::db::models::user::User;
use crate::lifecycle::{authz, Actor};
use crate::utils::api_response::ApiResponse;

async fn load_user(state: &AppState, id: &str) -> Result<User, ApiResponse<()>> {
    state.users.find_by_id(id).await?.ok_or_else(|| {
        ApiResponse::error(
            StatusCode::NOT_FOUND,
            "User not found",
            Some(json!({ "kind": "NOT_FOUND", "id": id })),
        )
    })
}

/// ✅ **Traveller profile** with blanks filled from the account.
#[utoipa::path(
    get,
    path = "/api/users/{id}/profile",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile retrieved", body = UserProfile),
        (status = 403, description = "Neither the user nor an administrator"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserProfile>, ApiResponse<()>> {
    let user = load_user(&state, &id).await?;
    authz::authorize_profile(&actor, &id, "view this profile")?;

    let stored = state.users.find_profile(&id).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile retrieved",
        UserProfile::for_user(&user, stored),
    ))
}

/// ✅ **Replace the traveller profile.** A non-blank `chineseName` also renames
/// the account.
#[utoipa::path(
    put,
    path = "/api/users/{id}/profile",
    params(("id" = String, Path, description = "User id")),
    request_body = UserProfile,
    responses(
        (status = 200, description = "Profile saved", body = UserProfile),
        (status = 403, description = "Neither the user nor an administrator"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(mut profile): Json<UserProfile>,
) -> Result<ApiResponse<UserProfile>, ApiResponse<()>> {
    let mut user = load_user(&state, &id).await?;
    authz::authorize_profile(&actor, &id, "edit this profile")?;

    profile.chinese_name = profile.chinese_name.trim().to_string();
    let rename = (!profile.chinese_name.is_empty() && profile.chinese_name != user.name)
        .then(|| profile.chinese_name.clone());

    state
        .users
        .save_profile(&id, &profile, rename.as_deref())
        .await?;

    if let Some(name) = rename {
        // Cached actors still carry the old display name.
        state.actor_cache.invalidate(&id);
        info!(user_id = %id, actor = %actor.id, "👤 Account renamed to {}", name);
        user.name = name;
    }
    info!(user_id = %id, actor = %actor.id, "📇 Profile saved");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile saved",
        UserProfile::for_user(&user, Some(profile)),
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_profile, update_profile),
    components(schemas(UserProfile, IdentityDocument, Gender)),
    tags((name = "Users", description = "Traveller profiles"))
)]
pub struct UserDoc;
