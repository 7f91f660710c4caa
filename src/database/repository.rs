use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::database::store::{DataStore, Embed, SelectQuery, TenantPath, UpdateQuery};
use crate::types::{RestaurantId, Table};

/// A typed row of one table
pub trait Entity: DeserializeOwned + Send {
    const TABLE: Table;

    /// Relations attached to every read of this entity
    fn embeds() -> Vec<Embed> {
        vec![]
    }
}

/// An entity owned by a restaurant
pub trait TenantEntity: Entity {
    const TENANT_PATH: TenantPath;
}

/// Typed access to one table through a `DataStore`
pub struct Repository<'a, T> {
    store: &'a dyn DataStore,
    _phantom: PhantomData<T>,
}

impl<'a, T: Entity> Repository<'a, T> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Unscoped query with the entity's embeds
    pub fn query(&self) -> SelectQuery {
        T::embeds()
            .into_iter()
            .fold(SelectQuery::new(T::TABLE), SelectQuery::embed)
    }

    pub async fn select_any(&self, query: SelectQuery) -> Result<Vec<T>, DatabaseError> {
        let rows = self.store.select(&query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_one(&self, query: SelectQuery) -> Result<Option<T>, DatabaseError> {
        Ok(self.select_any(query.limit(1)?).await?.into_iter().next())
    }

    pub async fn count(&self, query: SelectQuery) -> Result<i64, DatabaseError> {
        self.store.count(&query).await
    }

    pub async fn create(&self, row: &impl Serialize) -> Result<T, DatabaseError> {
        let row = self.store.insert(T::TABLE, to_object(row)?).await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn update(&self, id: &str, patch: Map<String, Value>) -> Result<T, DatabaseError> {
        self.apply(UpdateQuery::new(T::TABLE, id, patch)).await
    }

    async fn apply(&self, query: UpdateQuery) -> Result<T, DatabaseError> {
        let row = self
            .store
            .update(&query)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", T::TABLE, query.id)))?;
        Ok(serde_json::from_value(row)?)
    }
}

impl<'a, T: TenantEntity> Repository<'a, T> {
    /// Query restricted to rows owned by `restaurant_id`
    pub fn scoped(&self, restaurant_id: &RestaurantId) -> SelectQuery {
        self.query().tenant(T::TENANT_PATH, restaurant_id)
    }

    /// Update that only matches a row owned by `restaurant_id`
    pub async fn update_scoped(
        &self,
        restaurant_id: &RestaurantId,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<T, DatabaseError> {
        self.apply(UpdateQuery::new(T::TABLE, id, patch).tenant(T::TENANT_PATH, restaurant_id))
            .await
    }
}

/// Serialize a row or patch into a JSON object
pub fn to_object(value: &impl Serialize) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("Expected a JSON object row, got {}", other))),
    }
}
