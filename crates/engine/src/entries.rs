//! Ledger entries.
//!
//! An [`Entry`] is a signed amount attributed to exactly one member of one
//! group. Amounts are stored as signed integer **cents**:
//! - an expense entry is positive and grows the shared pool
//! - a settlement is recorded as a *pair* of entries: positive for the payer,
//!   negative for the receiver, linked by `pair_id`
//!
//! The pair shape is deliberate: [`Entry::settlement_pair`] is the only way
//! to build settlement entries, so a half-written pair cannot be expressed
//! in the domain layer. Persisting the two rows in one database transaction
//! is the engine's job.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub group_id: String,
    /// Member the signed amount is attributed to.
    pub user_id: String,
    pub amount: MoneyCents,
    pub is_settlement: bool,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Links the two halves of a settlement pair.
    pub pair_id: Option<Uuid>,
}

impl Entry {
    /// Creates an expense entry: `user_id` paid `amount` for the group.
    pub fn expense(
        group_id: String,
        user_id: String,
        amount: MoneyCents,
        note: Option<String>,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            user_id,
            amount,
            is_settlement: false,
            note,
            created_by,
            created_at,
            pair_id: None,
        })
    }

    /// Creates the two linked entries for "`from` pays `to` `amount`".
    ///
    /// The positive half counts as a contribution by the payer; the negative
    /// half reduces the receiver's paid total, since the cash changed hands
    /// outside the group pool. Callers must persist both or neither.
    pub fn settlement_pair(
        group_id: String,
        from: String,
        to: String,
        amount: MoneyCents,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<(Self, Self)> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }
        if from == to {
            return Err(EngineError::InvalidAmount(
                "cannot settle a debt with yourself".to_string(),
            ));
        }

        let pair_id = Uuid::new_v4();
        let payer = Self {
            id: Uuid::new_v4(),
            group_id: group_id.clone(),
            user_id: from.clone(),
            amount,
            is_settlement: true,
            note: note.clone(),
            created_by: from.clone(),
            created_at,
            pair_id: Some(pair_id),
        };
        let receiver = Self {
            id: Uuid::new_v4(),
            group_id,
            user_id: to,
            amount: -amount,
            is_settlement: true,
            note,
            created_by: from,
            created_at,
            pair_id: Some(pair_id),
        };
        Ok((payer, receiver))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub is_settlement: bool,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub pair_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            group_id: ActiveValue::Set(entry.group_id.clone()),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            amount_cents: ActiveValue::Set(entry.amount.cents()),
            is_settlement: ActiveValue::Set(entry.is_settlement),
            note: ActiveValue::Set(entry.note.clone()),
            created_by: ActiveValue::Set(entry.created_by.clone()),
            created_at: ActiveValue::Set(entry.created_at),
            pair_id: ActiveValue::Set(entry.pair_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::Integrity("invalid entry id".to_string()))?,
            group_id: model.group_id,
            user_id: model.user_id,
            amount: MoneyCents::new(model.amount_cents),
            is_settlement: model.is_settlement,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
            pair_id: model
                .pair_id
                .map(|id| {
                    Uuid::parse_str(&id)
                        .map_err(|_| EngineError::Integrity("invalid pair id".to_string()))
                })
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_rejects_non_positive_amounts() {
        for cents in [0, -100] {
            let err = Entry::expense(
                "g".to_string(),
                "alice".to_string(),
                MoneyCents::new(cents),
                None,
                "alice".to_string(),
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::InvalidAmount(_)));
        }
    }

    #[test]
    fn settlement_pair_halves_are_linked_and_opposite() {
        let (payer, receiver) = Entry::settlement_pair(
            "g".to_string(),
            "bob".to_string(),
            "alice".to_string(),
            MoneyCents::new(50_00),
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(payer.pair_id, receiver.pair_id);
        assert!(payer.pair_id.is_some());
        assert_eq!(payer.amount, -receiver.amount);
        assert!(payer.is_settlement && receiver.is_settlement);
        assert_eq!(payer.amount + receiver.amount, MoneyCents::ZERO);
    }

    #[test]
    fn settlement_pair_rejects_self_payment() {
        let err = Entry::settlement_pair(
            "g".to_string(),
            "bob".to_string(),
            "bob".to_string(),
            MoneyCents::new(1_00),
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}
