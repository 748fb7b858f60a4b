//! Persistence-backed facade over the expense-splitting domain.
//!
//! The [`Engine`] owns the database connection and exposes the group CRUD,
//! ledger writes, and the settlement summary. All balance math lives in the
//! pure [`settlement`] module; the engine's job is loading snapshots,
//! enforcing authorization, and keeping the ledger well-formed (most
//! importantly: writing settlement pairs atomically).

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

pub use currency::Currency;
pub use entries::Entry;
pub use error::EngineError;
pub use groups::{Group, GroupSnapshot};
pub use memberships::Role;
pub use money::MoneyCents;
pub use settlement::{
    MemberBalance, SignedEntry, Summary, TransferSuggestion, compute_summary,
};

mod currency;
pub mod entries;
mod error;
pub mod groups;
pub mod memberships;
mod money;
pub mod settlement;
pub mod users;

pub(crate) type ResultEngine<T> = Result<T, EngineError>;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Membership lookup doubling as the authorization check: a user who is
    /// not a member learns nothing about the group, not even that it exists.
    async fn membership(&self, group_id: &str, user_id: &str) -> ResultEngine<memberships::Model> {
        memberships::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    async fn require_owner(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        let membership = self.membership(group_id, user_id).await?;
        match Role::try_from(membership.role.as_str())? {
            Role::Owner => Ok(()),
            Role::Member => Err(EngineError::Forbidden(
                "only the group owner can do this".to_string(),
            )),
        }
    }

    /// Register a new user.
    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        name: &str,
        email: &str,
    ) -> ResultEngine<()> {
        if users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        users::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password.to_string()),
            name: ActiveValue::Set(name.to_string()),
            email: ActiveValue::Set(email.to_string()),
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }

    /// Create a group owned by `owner_id`, who becomes its first member.
    pub async fn new_group(
        &self,
        name: &str,
        owner_id: &str,
        currency: Option<Currency>,
    ) -> ResultEngine<String> {
        let group = Group::new(name.to_string(), owner_id, currency.unwrap_or_default());
        let group_id = group.id.clone();

        // Group and owner membership are one unit: a group without its owner
        // in the roster would break every membership check.
        let db_tx = self.database.begin().await?;
        groups::ActiveModel::from(&group).insert(&db_tx).await?;
        memberships::ActiveModel {
            group_id: ActiveValue::Set(group_id.clone()),
            user_id: ActiveValue::Set(owner_id.to_string()),
            role: ActiveValue::Set(Role::Owner.as_str().to_string()),
        }
        .insert(&db_tx)
        .await?;
        db_tx.commit().await?;

        Ok(group_id)
    }

    /// Return a group, visible to its members only.
    pub async fn group(&self, group_id: &str, user_id: &str) -> ResultEngine<Group> {
        self.membership(group_id, user_id).await?;
        let model = groups::Entity::find_by_id(group_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        Group::try_from(model)
    }

    /// Delete a group (owner only). Memberships and entries cascade.
    pub async fn delete_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        self.require_owner(group_id, user_id).await?;
        groups::Entity::delete_by_id(group_id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Add a registered user to the group roster (owner only).
    pub async fn add_member(
        &self,
        group_id: &str,
        username: &str,
        acting_user: &str,
    ) -> ResultEngine<()> {
        self.require_owner(group_id, acting_user).await?;

        if users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .is_none()
        {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        if memberships::Entity::find_by_id((group_id.to_string(), username.to_string()))
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        memberships::ActiveModel {
            group_id: ActiveValue::Set(group_id.to_string()),
            user_id: ActiveValue::Set(username.to_string()),
            role: ActiveValue::Set(Role::Member.as_str().to_string()),
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }

    /// Remove a member from the roster (owner only).
    ///
    /// The owner cannot be removed, and neither can a member with ledger
    /// entries: dropping them would orphan their entries and corrupt every
    /// summary computed afterwards.
    pub async fn remove_member(
        &self,
        group_id: &str,
        username: &str,
        acting_user: &str,
    ) -> ResultEngine<()> {
        self.require_owner(group_id, acting_user).await?;

        let membership = memberships::Entity::find_by_id((group_id.to_string(), username.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
        if Role::try_from(membership.role.as_str())? == Role::Owner {
            return Err(EngineError::Forbidden(
                "cannot remove the group owner".to_string(),
            ));
        }

        let entry_count = entries::Entity::find()
            .filter(entries::Column::GroupId.eq(group_id.to_string()))
            .filter(entries::Column::UserId.eq(username.to_string()))
            .count(&self.database)
            .await?;
        if entry_count > 0 {
            return Err(EngineError::Integrity(format!(
                "member \"{username}\" has ledger entries; settle before removing"
            )));
        }

        memberships::Entity::delete_by_id((group_id.to_string(), username.to_string()))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// List the group roster, visible to members only.
    pub async fn list_members(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<(String, Role)>> {
        self.membership(group_id, user_id).await?;

        let models = memberships::Entity::find()
            .filter(memberships::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(memberships::Column::UserId)
            .all(&self.database)
            .await?;

        let mut members = Vec::with_capacity(models.len());
        for model in models {
            let role = Role::try_from(model.role.as_str())?;
            members.push((model.user_id, role));
        }
        Ok(members)
    }

    /// Record that `user_id` paid `amount` for the group.
    pub async fn record_expense(
        &self,
        group_id: &str,
        amount: MoneyCents,
        note: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        self.membership(group_id, user_id).await?;

        let entry = Entry::expense(
            group_id.to_string(),
            user_id.to_string(),
            amount,
            note.map(|s| s.to_string()),
            user_id.to_string(),
            Utc::now(),
        )?;
        let entry_id = entry.id;
        entries::ActiveModel::from(&entry).insert(&self.database).await?;

        tracing::debug!(group_id, user_id, amount = %amount, "expense recorded");
        Ok(entry_id)
    }

    /// Record that `user_id` paid `to` to settle (part of) a debt.
    ///
    /// Both halves of the pair are committed in one database transaction, so
    /// a concurrent summary never observes a half-written settlement.
    /// Returns the pair id.
    pub async fn record_settlement(
        &self,
        group_id: &str,
        to: &str,
        amount: MoneyCents,
        note: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        self.membership(group_id, user_id).await?;
        if memberships::Entity::find_by_id((group_id.to_string(), to.to_string()))
            .one(&self.database)
            .await?
            .is_none()
        {
            return Err(EngineError::KeyNotFound("member not exists".to_string()));
        }

        let (payer, receiver) = Entry::settlement_pair(
            group_id.to_string(),
            user_id.to_string(),
            to.to_string(),
            amount,
            note.map(|s| s.to_string()),
            Utc::now(),
        )?;
        let pair_id = payer
            .pair_id
            .ok_or_else(|| EngineError::Integrity("settlement pair without pair id".to_string()))?;

        let db_tx = self.database.begin().await?;
        entries::ActiveModel::from(&payer).insert(&db_tx).await?;
        entries::ActiveModel::from(&receiver).insert(&db_tx).await?;
        db_tx.commit().await?;

        tracing::debug!(group_id, from = user_id, to, amount = %amount, "settlement recorded");
        Ok(pair_id)
    }

    /// Recent ledger entries, newest first.
    pub async fn entries(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Entry>> {
        self.membership(group_id, user_id).await?;

        let models = entries::Entity::find()
            .filter(entries::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(entries::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;

        models.into_iter().map(Entry::try_from).collect()
    }

    /// Load the full state of a group: roster plus complete ledger.
    pub async fn snapshot(&self, group_id: &str, user_id: &str) -> ResultEngine<GroupSnapshot> {
        let group = self.group(group_id, user_id).await?;

        let members = memberships::Entity::find()
            .filter(memberships::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(memberships::Column::UserId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let entries = entries::Entity::find()
            .filter(entries::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(entries::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Entry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(GroupSnapshot {
            group,
            members,
            entries,
        })
    }

    /// Compute the settlement summary for a group.
    ///
    /// Read-only and idempotent: no state is cached, the same ledger always
    /// produces the same summary. Callers that also need the group metadata
    /// should load one [`snapshot`](Self::snapshot) and use
    /// [`GroupSnapshot::summary`] on it.
    pub async fn summary(&self, group_id: &str, user_id: &str) -> ResultEngine<Summary> {
        self.snapshot(group_id, user_id).await?.summary()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`, verifying the database is reachable.
    pub async fn build(self) -> ResultEngine<Engine> {
        self.database.ping().await?;
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};

    async fn engine() -> Engine {
        let database = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&database, None).await.unwrap();
        Engine::builder().database(database).build().await.unwrap()
    }

    async fn register(engine: &Engine, username: &str) {
        engine
            .register_user(
                username,
                "secret",
                username,
                &format!("{username}@example.com"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let engine = engine().await;
        register(&engine, "alice").await;

        let err = engine
            .register_user("alice", "other", "Alice", "alice@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
    }

    #[tokio::test]
    async fn group_is_invisible_to_non_members() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "mallory").await;
        let group_id = engine.new_group("Trip", "alice", None).await.unwrap();

        assert!(engine.group(&group_id, "alice").await.is_ok());
        let err = engine.group(&group_id, "mallory").await.unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn only_the_owner_manages_the_roster() {
        let engine = engine().await;
        for user in ["alice", "bob", "carol"] {
            register(&engine, user).await;
        }
        let group_id = engine.new_group("Trip", "alice", None).await.unwrap();
        engine.add_member(&group_id, "bob", "alice").await.unwrap();

        let err = engine
            .add_member(&group_id, "carol", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let err = engine
            .remove_member(&group_id, "alice", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn expense_and_summary_round_trip() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "bob").await;
        let group_id = engine.new_group("Flat", "alice", None).await.unwrap();
        engine.add_member(&group_id, "bob", "alice").await.unwrap();

        engine
            .record_expense(&group_id, MoneyCents::new(100_00), Some("groceries"), "alice")
            .await
            .unwrap();

        let summary = engine.summary(&group_id, "bob").await.unwrap();
        assert_eq!(summary.total_pool, MoneyCents::new(100_00));
        assert_eq!(summary.split_per_head, MoneyCents::new(50_00));
        assert_eq!(
            summary.transfers,
            vec![TransferSuggestion {
                from: "bob".to_string(),
                to: "alice".to_string(),
                amount: MoneyCents::new(50_00),
            }]
        );
    }

    #[tokio::test]
    async fn settlement_writes_a_linked_pair_and_clears_the_debt() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "bob").await;
        let group_id = engine.new_group("Flat", "alice", None).await.unwrap();
        engine.add_member(&group_id, "bob", "alice").await.unwrap();
        engine
            .record_expense(&group_id, MoneyCents::new(100_00), None, "alice")
            .await
            .unwrap();

        let pair_id = engine
            .record_settlement(&group_id, "alice", MoneyCents::new(50_00), None, "bob")
            .await
            .unwrap();

        let entries = engine.entries(&group_id, "alice", 50).await.unwrap();
        let halves: Vec<_> = entries
            .iter()
            .filter(|e| e.pair_id == Some(pair_id))
            .collect();
        assert_eq!(halves.len(), 2);
        assert_eq!(halves[0].amount + halves[1].amount, MoneyCents::ZERO);

        let summary = engine.summary(&group_id, "alice").await.unwrap();
        assert_eq!(summary.total_pool, MoneyCents::new(100_00));
        assert!(summary.transfers.is_empty());
    }

    #[tokio::test]
    async fn snapshot_summary_matches_engine_summary() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "bob").await;
        let group_id = engine.new_group("Flat", "alice", None).await.unwrap();
        engine.add_member(&group_id, "bob", "alice").await.unwrap();
        engine
            .record_expense(&group_id, MoneyCents::new(100_00), None, "alice")
            .await
            .unwrap();

        let snapshot = engine.snapshot(&group_id, "bob").await.unwrap();
        let from_snapshot = snapshot.summary().unwrap();
        let from_engine = engine.summary(&group_id, "bob").await.unwrap();
        assert_eq!(from_snapshot, from_engine);
        assert_eq!(snapshot.group.id, group_id);
    }

    #[tokio::test]
    async fn settlement_requires_a_member_counterparty() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "bob").await;
        let group_id = engine.new_group("Flat", "alice", None).await.unwrap();

        let err = engine
            .record_settlement(&group_id, "bob", MoneyCents::new(10_00), None, "alice")
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::KeyNotFound("member not exists".to_string()));
    }

    #[tokio::test]
    async fn member_with_entries_cannot_be_removed() {
        let engine = engine().await;
        register(&engine, "alice").await;
        register(&engine, "bob").await;
        let group_id = engine.new_group("Flat", "alice", None).await.unwrap();
        engine.add_member(&group_id, "bob", "alice").await.unwrap();
        engine
            .record_expense(&group_id, MoneyCents::new(10_00), None, "bob")
            .await
            .unwrap();

        let err = engine
            .remove_member(&group_id, "bob", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Integrity(_)));
    }
}
