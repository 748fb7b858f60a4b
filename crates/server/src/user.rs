//! User entity (for the auth middleware) and the registration endpoint.

use api_types::user::RegisterUser;
use axum::{Json, extract::State, http::StatusCode};
use sea_orm::entity::prelude::*;

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Handle requests for creating a new account.
///
/// This is the only route outside the auth middleware.
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterUser>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .register_user(
            &payload.username,
            &payload.password,
            &payload.name,
            &payload.email,
        )
        .await?;

    Ok(StatusCode::CREATED)
}
