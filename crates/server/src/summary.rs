//! Settlement summary endpoint.

use api_types::summary::{MemberBalanceView, SummaryResponse, TransferView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{ServerError, map_currency, server::ServerState, user};

/// Handle requests for the group settlement summary.
///
/// The summary itself is a pure computation over one snapshot load; the only
/// thing decided here is `can_settle`, which marks the transfers the caller
/// is the payer of.
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let snapshot = state.engine.snapshot(&group_id, &user.username).await?;
    let summary = snapshot.summary()?;
    let group = snapshot.group;

    let members = summary
        .balances
        .into_iter()
        .map(|balance| MemberBalanceView {
            member: balance.member_id,
            paid_cents: balance.paid.cents(),
            owed_cents: balance.owed.cents(),
            balance_cents: balance.balance.cents(),
        })
        .collect();

    let transactions = summary
        .transfers
        .into_iter()
        .map(|transfer| TransferView {
            can_settle: transfer.from == user.username,
            from: transfer.from,
            to: transfer.to,
            amount_cents: transfer.amount.cents(),
        })
        .collect();

    Ok(Json(SummaryResponse {
        group: group.id,
        currency: map_currency(group.currency),
        total_expense_cents: summary.total_pool.cents(),
        split_per_head_cents: summary.split_per_head.cents(),
        members,
        transactions,
    }))
}
