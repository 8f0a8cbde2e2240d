use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::db::queries::users::{get_profile, update_profile};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users/{id}/profile", get(get_profile).put(update_profile))
}
