use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::database::manager::{DatabaseError, CHANGE_CHANNEL};
use crate::database::query_builder::{bind_param_query, QueryBuilder};
use crate::database::store::{ChangeEvent, ChangeFeed, DataStore, SelectQuery, UpdateQuery};
use crate::filter::SqlResult;
use crate::types::{ChangeKind, Table};

/// Payload published by the `admin_notify_change` trigger
#[derive(Debug, Deserialize)]
struct ChangeNotification {
    table: String,
    op: String,
}

/// `DataStore` backed by a Postgres pool, with change feeds over LISTEN/NOTIFY
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    feed_buffer: usize,
    log_queries: bool,
}

impl PgStore {
    pub fn new(pool: PgPool, feed_buffer: usize) -> Self {
        Self {
            pool,
            feed_buffer: feed_buffer.max(1),
            log_queries: false,
        }
    }

    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn log(&self, sql: &SqlResult) {
        if self.log_queries {
            debug!(query = %sql.query, params = sql.params.len(), "store query");
        }
    }

    async fn fetch_rows(&self, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError> {
        self.log(sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
            .collect()
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DatabaseError> {
        let sql = QueryBuilder::select_sql(query)?;
        self.fetch_rows(&sql).await
    }

    async fn count(&self, query: &SelectQuery) -> Result<i64, DatabaseError> {
        let sql = QueryBuilder::count_sql(query)?;
        self.log(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn insert(&self, table: Table, row: Map<String, Value>) -> Result<Value, DatabaseError> {
        let sql = QueryBuilder::insert_sql(table, &row)?;
        self.fetch_rows(&sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("Insert into {} returned no row", table)))
    }

    async fn update(&self, query: &UpdateQuery) -> Result<Option<Value>, DatabaseError> {
        let sql = QueryBuilder::update_sql(query)?;
        Ok(self.fetch_rows(&sql).await?.into_iter().next())
    }

    async fn subscribe(&self, table: Table, key: &str) -> Result<ChangeFeed, DatabaseError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let (tx, rx) = mpsc::channel(self.feed_buffer);
        let feed_key = key.to_string();
        let task = tokio::spawn(async move {
            loop {
                let notification = match listener.recv().await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Change feed {} lost its listener: {}", feed_key, e);
                        break;
                    }
                };
                let Ok(change) = serde_json::from_str::<ChangeNotification>(notification.payload()) else {
                    warn!("Ignoring malformed change payload: {}", notification.payload());
                    continue;
                };
                if change.table != table.as_str() {
                    continue;
                }
                let Some(kind) = ChangeKind::from_op(&change.op) else {
                    continue;
                };
                // A full buffer already holds a pending signal
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(ChangeEvent { table, kind }) {
                    break;
                }
            }
        });

        Ok(ChangeFeed::new(key, rx, move || task.abort()))
    }
}
