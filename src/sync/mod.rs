//! Scoped live queries over the admin tables.
//!
//! Each hook follows the session (and, for super-admins, the restaurant
//! selection), keeps one realtime channel open for its current scope and
//! re-reads whenever that channel reports a change.

pub mod categories;
pub mod dashboard;
pub mod live;
pub mod menu_items;
pub mod orders;
pub mod realtime;
pub mod restaurants;
pub mod scope;
pub mod users;

pub use categories::CategoriesHook;
pub use dashboard::{PlatformStats, PlatformStatsHook, RestaurantStats, RestaurantStatsHook};
pub use live::{HookState, LiveDeps, LiveQuery, Loader};
pub use menu_items::{MenuCatalog, MenuItemsHook};
pub use orders::OrdersHook;
pub use realtime::{channel_key, RealtimeChannel};
pub use restaurants::RestaurantsHook;
pub use scope::{resolve_scope, RestaurantSelector, ScopePolicy};
pub use users::{UserDirectory, UsersHook};
