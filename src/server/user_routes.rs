use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::json::ApiJson;
use super::session::Session;
use super::state::{GuardedAuthManager, ServerState};
use crate::error::AppResult;
use crate::user::{ProfileUpdate, PublicProfile, UserProfile};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct UpdateProfileBody {
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

async fn get_me(
    session: Session,
    State(auth_manager): State<GuardedAuthManager>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(auth_manager.profile(&session.user_id)?))
}

async fn put_me(
    session: Session,
    State(auth_manager): State<GuardedAuthManager>,
    ApiJson(body): ApiJson<UpdateProfileBody>,
) -> AppResult<Json<UserProfile>> {
    debug!("Profile update for {}: {:?}", session.user_id, body);
    let update = ProfileUpdate {
        display_name: body.display_name,
        profile_image_url: body.profile_image_url,
    };
    Ok(Json(auth_manager.update_profile(&session.user_id, update)?))
}

async fn get_user(
    _session: Session,
    State(auth_manager): State<GuardedAuthManager>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    Ok(Json(auth_manager.public_profile(&id)?))
}

/// Routes under `/users`. The caller adds the session layer.
pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/me", get(get_me).put(put_me))
        .route("/{id}", get(get_user))
        .with_state(state)
}
