//! Group API endpoints

use api_types::group::{Group, GroupNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, map_currency, server::ServerState, user};

/// Handle requests for creating a new `Group`
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<Group>), ServerError> {
    let currency = payload.currency.unwrap_or_default();
    let group_id = state
        .engine
        .new_group(
            &payload.name,
            &user.username,
            Some(match currency {
                api_types::Currency::Eur => engine::Currency::Eur,
            }),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Group {
            id: group_id,
            name: payload.name,
            owner: user.username,
            currency,
        }),
    ))
}

/// Handle requests for fetching a group the caller belongs to
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<Group>, ServerError> {
    let group = state.engine.group(&group_id, &user.username).await?;

    Ok(Json(Group {
        id: group.id,
        name: group.name,
        owner: group.owner_id,
        currency: map_currency(group.currency),
    }))
}

/// Handle requests for deleting a group (owner only)
pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(&group_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
