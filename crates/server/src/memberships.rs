//! Roster management endpoints (owner-only for writes).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use api_types::member::{MemberAdd, MemberRole, MemberView, MembersResponse};

use crate::{ServerError, server::ServerState, user};

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<MembersResponse>, ServerError> {
    let members = state
        .engine
        .list_members(&group_id, &user.username)
        .await?
        .into_iter()
        .map(|(username, role)| MemberView {
            username,
            role: match role {
                engine::Role::Owner => MemberRole::Owner,
                engine::Role::Member => MemberRole::Member,
            },
        })
        .collect();

    Ok(Json(MembersResponse { members }))
}

pub async fn add(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<MemberAdd>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_member(&group_id, &payload.username, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, username)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_member(&group_id, &username, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
