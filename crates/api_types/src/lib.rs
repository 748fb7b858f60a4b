use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

pub mod user {
    use super::*;

    /// Request body for creating an account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterUser {
        pub username: String,
        pub password: String,
        pub name: String,
        pub email: String,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Group {
        pub id: String,
        pub name: String,
        pub owner: String,
        pub currency: Currency,
    }
}

pub mod member {
    use super::*;

    /// Role of a user in a group.
    ///
    /// The server treats roles as:
    /// - `owner`: manages the roster and can delete the group.
    /// - `member`: records expenses and settlements.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberRole {
        Owner,
        Member,
    }

    /// Request body for adding a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdd {
        pub username: String,
    }

    /// A member with their role.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub username: String,
        pub role: MemberRole,
    }

    /// Response body for listing members.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }
}

pub mod entry {
    use super::*;

    /// Request body for recording an expense paid by the caller.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        /// Must be > 0, in cents.
        pub amount_cents: i64,
        pub note: Option<String>,
    }

    /// Request body for executing a suggested transfer: the caller pays `to`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub to: String,
        /// Must be > 0, in cents.
        pub amount_cents: i64,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryView {
        pub id: Uuid,
        /// Member the signed amount is attributed to.
        pub member: String,
        pub amount_cents: i64,
        pub is_settlement: bool,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntriesResponse {
        pub entries: Vec<EntryView>,
    }

    /// Query parameters for the ledger listing.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EntryListQuery {
        pub limit: Option<u64>,
    }
}

pub mod summary {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberBalanceView {
        pub member: String,
        pub paid_cents: i64,
        pub owed_cents: i64,
        /// Positive = the group owes this member; negative = they owe.
        pub balance_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub from: String,
        pub to: String,
        pub amount_cents: i64,
        /// Whether the authenticated caller is the one who should execute
        /// this transfer (`caller == from`).
        pub can_settle: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryResponse {
        pub group: String,
        pub currency: Currency,
        pub total_expense_cents: i64,
        pub split_per_head_cents: i64,
        pub members: Vec<MemberBalanceView>,
        pub transactions: Vec<TransferView>,
    }
}
