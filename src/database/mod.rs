pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::{MemoryStore, ReadRecord};
pub use postgres::PgStore;
pub use repository::{Entity, Repository, TenantEntity};
pub use store::{ChangeEvent, ChangeFeed, DataStore, Embed, SelectQuery, TenantPath, TenantPredicate, UpdateQuery};
