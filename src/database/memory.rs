use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{
    ChangeEvent, ChangeFeed, DataStore, Embed, SelectQuery, TenantPath, TenantPredicate, UpdateQuery,
};
use crate::types::{ChangeKind, RestaurantId, Table};

/// One read issued against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub table: Table,
    pub restaurant_id: Option<RestaurantId>,
}

struct Subscriber {
    id: u64,
    table: Table,
    key: String,
    sender: mpsc::Sender<ChangeEvent>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Value>>,
    subscribers: Vec<Subscriber>,
    reads: Vec<ReadRecord>,
    next_subscriber: u64,
    fail_reads: Option<String>,
}

/// In-process `DataStore` with the same query semantics as `PgStore`.
///
/// Every read and every open subscription is recorded so callers can assert
/// on store traffic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    feed_buffer: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            feed_buffer: 64,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a row without notifying subscribers
    pub fn seed(&self, table: Table, row: Value) {
        self.lock().tables.entry(table).or_default().push(row);
    }

    /// Insert a row as another session would, notifying subscribers
    pub fn insert_now(&self, table: Table, row: Value) -> Value {
        let mut inner = self.lock();
        let row = Self::stamp_new(row);
        inner.tables.entry(table).or_default().push(row.clone());
        Self::notify(&mut inner, table, ChangeKind::Insert);
        row
    }

    /// Patch a row by id as another session would, notifying subscribers
    pub fn update_now(&self, table: Table, id: &str, patch: Value) -> Option<Value> {
        let mut inner = self.lock();
        let updated = Self::patch_row(&mut inner, table, id, patch.as_object()?.clone(), None)?;
        Self::notify(&mut inner, table, ChangeKind::Update);
        Some(updated)
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    pub fn find(&self, table: Table, id: &str) -> Option<Value> {
        self.lock()
            .tables
            .get(&table)?
            .iter()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
    }

    pub fn reads(&self) -> Vec<ReadRecord> {
        self.lock().reads.clone()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads.len()
    }

    pub fn clear_reads(&self) {
        self.lock().reads.clear();
    }

    /// Keys of the subscriptions that are currently open
    pub fn active_subscriptions(&self) -> Vec<String> {
        self.lock().subscribers.iter().map(|s| s.key.clone()).collect()
    }

    /// Make every subsequent read fail with `message` (`None` to recover)
    pub fn fail_reads(&self, message: Option<&str>) {
        self.lock().fail_reads = message.map(str::to_string);
    }

    fn notify(inner: &mut Inner, table: Table, kind: ChangeKind) {
        inner.subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in inner.subscribers.iter().filter(|s| s.table == table) {
            // A full buffer already holds a pending signal
            let _ = subscriber.sender.try_send(ChangeEvent { table, kind });
        }
    }

    fn stamp_new(mut row: Value) -> Value {
        if let Some(obj) = row.as_object_mut() {
            let now = Value::String(Utc::now().to_rfc3339());
            obj.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            obj.entry("created_at").or_insert_with(|| now.clone());
            obj.entry("updated_at").or_insert(now);
        }
        row
    }

    fn patch_row(
        inner: &mut Inner,
        table: Table,
        id: &str,
        patch: Map<String, Value>,
        tenant: Option<&TenantPredicate>,
    ) -> Option<Value> {
        if let Some(tenant) = tenant {
            let row = inner.tables.get(&table)?.iter().find(|r| row_id(r) == Some(id))?;
            if !Self::in_tenant(&inner.tables, row, tenant) {
                return None;
            }
        }
        let row = inner
            .tables
            .get_mut(&table)?
            .iter_mut()
            .find(|r| row_id(r) == Some(id))?;
        let obj = row.as_object_mut()?;
        for (k, v) in patch {
            obj.insert(k, v);
        }
        Some(row.clone())
    }

    fn in_tenant(tables: &HashMap<Table, Vec<Value>>, row: &Value, tenant: &TenantPredicate) -> bool {
        let wanted = tenant.restaurant_id.as_str();
        match tenant.path {
            TenantPath::Direct => row.get("restaurant_id").and_then(Value::as_str) == Some(wanted),
            TenantPath::ViaCategory => {
                let Some(category_id) = row.get("category_id").and_then(Value::as_str) else {
                    return false;
                };
                tables
                    .get(&Table::MenuCategories)
                    .map(|categories| {
                        categories.iter().any(|c| {
                            row_id(c) == Some(category_id)
                                && c.get("restaurant_id").and_then(Value::as_str) == Some(wanted)
                        })
                    })
                    .unwrap_or(false)
            }
        }
    }

    fn attach_embeds(tables: &HashMap<Table, Vec<Value>>, mut row: Value, embeds: &[Embed]) -> Value {
        for embed in embeds {
            let local = row.get(embed.local_column).cloned().unwrap_or(Value::Null);
            let related: Vec<Value> = tables
                .get(&embed.table)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| !local.is_null() && r.get(embed.foreign_column) == Some(&local))
                        .map(|r| {
                            let projected: Map<String, Value> = embed
                                .columns
                                .iter()
                                .map(|c| (c.to_string(), r.get(*c).cloned().unwrap_or(Value::Null)))
                                .collect();
                            Value::Object(projected)
                        })
                        .collect()
                })
                .unwrap_or_default();
            if let Some(obj) = row.as_object_mut() {
                obj.insert(embed.name.to_string(), Value::Array(related));
            }
        }
        row
    }

    fn matching(inner: &mut Inner, query: &SelectQuery) -> Result<Vec<Value>, DatabaseError> {
        inner.reads.push(ReadRecord {
            table: query.table,
            restaurant_id: query.scope().cloned(),
        });
        if let Some(message) = &inner.fail_reads {
            return Err(DatabaseError::QueryError(message.clone()));
        }

        let tables = &inner.tables;
        let scoped: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| match &query.tenant {
                        Some(tenant) => Self::in_tenant(tables, row, tenant),
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(query.filter.apply(scoped)?)
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DatabaseError> {
        let mut inner = self.lock();
        let rows = Self::matching(&mut inner, query)?;
        Ok(rows
            .into_iter()
            .map(|row| Self::attach_embeds(&inner.tables, row, &query.embeds))
            .collect())
    }

    async fn count(&self, query: &SelectQuery) -> Result<i64, DatabaseError> {
        let mut inner = self.lock();
        Ok(Self::matching(&mut inner, query)?.len() as i64)
    }

    async fn insert(&self, table: Table, row: Map<String, Value>) -> Result<Value, DatabaseError> {
        Ok(self.insert_now(table, Value::Object(row)))
    }

    async fn update(&self, query: &UpdateQuery) -> Result<Option<Value>, DatabaseError> {
        let mut inner = self.lock();
        let updated = Self::patch_row(&mut inner, query.table, &query.id, query.patch.clone(), query.tenant.as_ref());
        if updated.is_some() {
            Self::notify(&mut inner, query.table, ChangeKind::Update);
        }
        Ok(updated)
    }

    async fn subscribe(&self, table: Table, key: &str) -> Result<ChangeFeed, DatabaseError> {
        let (tx, rx) = mpsc::channel(self.feed_buffer.max(1));
        let id = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.push(Subscriber {
                id,
                table,
                key: key.to_string(),
                sender: tx,
            });
            id
        };

        let inner = Arc::clone(&self.inner);
        Ok(ChangeFeed::new(key, rx, move || {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscribers.retain(|s| s.id != id);
        }))
    }
}
