//! A `Group` is the unit of expense sharing: a set of members plus a ledger
//! of signed entries. A user can belong to any number of groups.

use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError,
    entries::Entry,
    settlement::{SignedEntry, Summary, compute_summary},
};

/// Expense-sharing group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub currency: Currency,
}

impl Group {
    pub fn new(name: String, owner_id: &str, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            owner_id: owner_id.to_string(),
            currency,
        }
    }
}

/// The full state of one group at a point in time: the member roster and the
/// complete ledger. This is the unit of input to
/// [`compute_summary`](crate::settlement::compute_summary).
///
/// Invariant (enforced at write time and re-checked by the settlement math):
/// every entry's member belongs to `members`.
#[derive(Clone, Debug)]
pub struct GroupSnapshot {
    pub group: Group,
    pub members: Vec<String>,
    pub entries: Vec<Entry>,
}

impl GroupSnapshot {
    /// Settlement summary of this snapshot. Pure; callers that already hold
    /// a snapshot get the summary without touching the database again.
    pub fn summary(&self) -> Result<Summary, EngineError> {
        let signed: Vec<SignedEntry> = self.entries.iter().map(SignedEntry::from).collect();
        compute_summary(&self.members, &signed)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::memberships::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(value: &Group) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
        }
    }
}

impl TryFrom<Model> for Group {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        // A stored currency the engine cannot parse is corrupted data, not a
        // user mistake: refuse to load rather than coerce to the default.
        let currency = Currency::try_from(model.currency.as_str()).map_err(|_| {
            EngineError::Integrity(format!(
                "group \"{}\" has an invalid stored currency \"{}\"",
                model.id, model.currency
            ))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            owner_id: model.owner_id,
            currency,
        })
    }
}
