//! Ledger API endpoints: expenses, settlements, listing.

use api_types::entry::{
    EntriesResponse, EntryCreated, EntryListQuery, EntryView, ExpenseNew, SettlementNew,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::FixedOffset;
use engine::MoneyCents;

use crate::{ServerError, server::ServerState, user};

const DEFAULT_LIMIT: u64 = 50;

/// Handle requests for recording an expense paid by the caller.
pub async fn expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<EntryCreated>), ServerError> {
    let id = state
        .engine
        .record_expense(
            &group_id,
            MoneyCents::new(payload.amount_cents),
            payload.note.as_deref(),
            &user.username,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(EntryCreated { id })))
}

/// Handle requests for executing a suggested transfer.
///
/// The payer is always the authenticated caller; paying on someone else's
/// behalf is not a thing.
pub async fn settle(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<EntryCreated>), ServerError> {
    let id = state
        .engine
        .record_settlement(
            &group_id,
            &payload.to,
            MoneyCents::new(payload.amount_cents),
            payload.note.as_deref(),
            &user.username,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(EntryCreated { id })))
}

/// Handle requests for listing the group ledger, newest first.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<EntriesResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state
        .engine
        .entries(&group_id, &user.username, limit)
        .await?;

    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    let entries = entries
        .into_iter()
        .map(|entry| EntryView {
            id: entry.id,
            member: entry.user_id,
            amount_cents: entry.amount.cents(),
            is_settlement: entry.is_settlement,
            note: entry.note,
            created_at: entry.created_at.with_timezone(&utc),
        })
        .collect();

    Ok(Json(EntriesResponse { entries }))
}
