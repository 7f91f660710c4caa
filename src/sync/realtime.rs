use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::database::{DataStore, DatabaseError};
use crate::types::{Scope, Table};

/// Channel key: one per (table, scope)
pub fn channel_key(table: Table, scope: &Scope) -> String {
    format!("{}:{}", table, scope.key())
}

/// Change subscription for one (table, scope) that turns bursts of change
/// events into single "stale" signals.
///
/// The signal carries the channel key so a consumer can ignore signals from
/// a channel it has already replaced.
pub struct RealtimeChannel {
    key: String,
    task: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    pub async fn open(
        store: &dyn DataStore,
        table: Table,
        scope: &Scope,
        debounce: Duration,
        stale: mpsc::Sender<String>,
    ) -> Result<Self, DatabaseError> {
        let key = channel_key(table, scope);
        let mut feed = store.subscribe(table, &key).await?;
        info!("Opened realtime channel {}", key);

        let task_key = key.clone();
        let task = tokio::spawn(async move {
            while let Some(first) = feed.recv().await {
                tokio::time::sleep(debounce).await;
                let mut coalesced = 1;
                while feed.try_recv().is_some() {
                    coalesced += 1;
                }
                debug!("{} {:?} (+{} coalesced) on {}", first.table, first.kind, coalesced - 1, task_key);
                if stale.send(task_key.clone()).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { key, task: Some(task) })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop delivery and wait until the store subscription is released
    pub async fn close(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Closed realtime channel {}", self.key);
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Dropped realtime channel {}", self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::types::RestaurantId;
    use serde_json::json;

    #[tokio::test]
    async fn bursts_collapse_into_one_signal() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::channel(8);
        let scope = Scope::Restaurant(RestaurantId::new("r1"));
        let channel = RealtimeChannel::open(&store, Table::Orders, &scope, Duration::from_millis(30), tx)
            .await
            .unwrap();
        assert_eq!(channel.key(), "orders:restaurant:r1");

        for _ in 0..5 {
            store.insert_now(Table::Orders, json!({ "restaurant_id": "r1" }));
        }
        let key = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(key, "orders:restaurant:r1");
        assert!(tokio::time::timeout(Duration::from_millis(100), rx.recv()).await.is_err());

        channel.close().await;
        assert!(store.active_subscriptions().is_empty());
    }
}
