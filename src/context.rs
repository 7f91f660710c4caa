use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AdminGuard, Navigator, SessionContext};
use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::database::DataStore;
use crate::sync::{
    CategoriesHook, LiveDeps, MenuItemsHook, OrdersHook, PlatformStatsHook, RestaurantSelector, RestaurantStatsHook,
    RestaurantsHook, UsersHook,
};

/// Wiring shared by every screen of the dashboard: one store, one session,
/// one restaurant selection and one backend client.
#[derive(Clone)]
pub struct AdminContext {
    pub store: Arc<dyn DataStore>,
    pub session: SessionContext,
    pub selector: RestaurantSelector,
    pub backend: BackendClient,
    pub config: AppConfig,
}

impl AdminContext {
    pub fn new(store: Arc<dyn DataStore>, session: SessionContext, backend: BackendClient, config: AppConfig) -> Self {
        let selector = RestaurantSelector::new(session.clone());
        Self {
            store,
            session,
            selector,
            backend,
            config,
        }
    }

    pub fn deps(&self) -> LiveDeps {
        LiveDeps {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            selector: Some(self.selector.clone()),
            debounce: Duration::from_millis(self.config.realtime.debounce_ms),
        }
    }

    pub fn categories(&self) -> CategoriesHook {
        CategoriesHook::spawn(self.deps())
    }

    pub fn menu_items(&self) -> MenuItemsHook {
        MenuItemsHook::spawn(self.deps())
    }

    pub fn orders(&self) -> OrdersHook {
        OrdersHook::spawn(self.deps(), self.backend.clone(), self.config.orders.review_variant)
    }

    /// `enabled` is false on screens that must not read platform data
    pub fn restaurants(&self, enabled: bool) -> RestaurantsHook {
        RestaurantsHook::spawn(self.deps(), enabled, self.config.restaurants.trial_days)
    }

    pub fn users(&self, enabled: bool) -> UsersHook {
        UsersHook::spawn(self.deps(), enabled, self.backend.clone())
    }

    pub fn platform_stats(&self, enabled: bool) -> PlatformStatsHook {
        PlatformStatsHook::spawn(self.deps(), enabled)
    }

    pub fn restaurant_stats(&self) -> RestaurantStatsHook {
        RestaurantStatsHook::spawn(self.deps())
    }

    pub fn guard(&self, navigator: Arc<dyn Navigator>) -> AdminGuard {
        AdminGuard::new(self.session.clone(), navigator)
    }
}
