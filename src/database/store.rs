use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::database::manager::DatabaseError;
use crate::filter::Filter;
use crate::types::{ChangeKind, RestaurantId, Table};

/// How rows of a table reach their owning restaurant.
///
/// Menu items carry no restaurant key. Their tenant is derived through
/// `menu_categories`, so scoping them is a semi-join on the category rather
/// than a column comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantPath {
    /// `restaurant_id` column on the row itself
    Direct,
    /// `category_id` → `menu_categories.restaurant_id`
    ViaCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPredicate {
    pub path: TenantPath,
    pub restaurant_id: RestaurantId,
}

/// Related rows attached to each result row under `name`.
///
/// Embeds always come back as a JSON array, even for to-one relations;
/// models unwrap them with `models::embedded::one`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub name: &'static str,
    pub table: Table,
    /// Column on the embedded table
    pub foreign_column: &'static str,
    /// Column on the parent row it must equal
    pub local_column: &'static str,
    pub columns: &'static [&'static str],
}

impl Embed {
    /// Parent holds the key: `parent.local_column = embedded.id`
    pub const fn to_one(name: &'static str, table: Table, local_column: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, table, foreign_column: "id", local_column, columns }
    }

    /// Embedded rows hold the key: `embedded.foreign_column = parent.id`
    pub const fn to_many(name: &'static str, table: Table, foreign_column: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, table, foreign_column, local_column: "id", columns }
    }
}

/// A scoped read against one table
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub table: Table,
    pub filter: Filter,
    pub tenant: Option<TenantPredicate>,
    pub embeds: Vec<Embed>,
}

impl SelectQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filter: Filter::new(),
            tenant: None,
            embeds: vec![],
        }
    }

    pub fn where_clause(mut self, conditions: Value) -> Result<Self, DatabaseError> {
        self.filter.where_clause(conditions)?;
        Ok(self)
    }

    pub fn order(mut self, order: &str) -> Result<Self, DatabaseError> {
        self.filter.order(order)?;
        Ok(self)
    }

    pub fn limit(mut self, limit: i32) -> Result<Self, DatabaseError> {
        self.filter.limit(limit)?;
        Ok(self)
    }

    pub fn tenant(mut self, path: TenantPath, restaurant_id: &RestaurantId) -> Self {
        self.tenant = Some(TenantPredicate {
            path,
            restaurant_id: restaurant_id.clone(),
        });
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Restaurant this read is scoped to, if any
    pub fn scope(&self) -> Option<&RestaurantId> {
        self.tenant.as_ref().map(|t| &t.restaurant_id)
    }
}

/// Single-row update by id, optionally constrained to a tenant
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    pub table: Table,
    pub id: String,
    pub patch: Map<String, Value>,
    pub tenant: Option<TenantPredicate>,
}

impl UpdateQuery {
    pub fn new(table: Table, id: impl Into<String>, patch: Map<String, Value>) -> Self {
        Self {
            table,
            id: id.into(),
            patch,
            tenant: None,
        }
    }

    pub fn tenant(mut self, path: TenantPath, restaurant_id: &RestaurantId) -> Self {
        self.tenant = Some(TenantPredicate {
            path,
            restaurant_id: restaurant_id.clone(),
        });
        self
    }
}

/// "Something changed" signal; carries no row payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
}

/// Subscription to change events for one table.
///
/// Dropping the feed unsubscribes.
pub struct ChangeFeed {
    key: String,
    receiver: mpsc::Receiver<ChangeEvent>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeFeed {
    pub fn new(key: impl Into<String>, receiver: mpsc::Receiver<ChangeEvent>, on_close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            key: key.into(),
            receiver,
            on_close: Some(Box::new(on_close)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next event, or `None` once the store side has gone away
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking poll used to drain a burst
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed").field("key", &self.key).finish()
    }
}

/// Hosted database contract: scoped CRUD plus table change subscriptions.
///
/// Rows travel as JSON objects; typed access goes through `Repository`.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, query: &SelectQuery) -> Result<i64, DatabaseError>;

    /// Insert one row; server-assigned columns are filled in the returned row
    async fn insert(&self, table: Table, row: Map<String, Value>) -> Result<Value, DatabaseError>;

    /// Update one row by id; `None` when no row matched (including tenant mismatch)
    async fn update(&self, query: &UpdateQuery) -> Result<Option<Value>, DatabaseError>;

    /// Open a change feed for `table`; `key` identifies the subscriber
    async fn subscribe(&self, table: Table, key: &str) -> Result<ChangeFeed, DatabaseError>;
}
