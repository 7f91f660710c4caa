use std::ops::Deref;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::database::models::{Category, MenuItem, Order, PaymentStatus, Restaurant, User};
use crate::database::{DataStore, DatabaseError, Repository, SelectQuery, TenantEntity};
use crate::types::{Scope, Table};

/// Number of orders shown on the restaurant dashboard
pub const RECENT_ORDERS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_restaurants: i64,
    pub active_restaurants: i64,
    pub total_users: i64,
    pub total_orders: i64,
    /// Sum over verified payments only
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantStats {
    pub total_orders: i64,
    /// Awaiting confirmation or payment review
    pub pending_orders: i64,
    pub revenue: Decimal,
    pub avg_order_value: Decimal,
    pub menu_items: i64,
    pub categories: i64,
    pub recent_orders: Vec<Order>,
}

/// Sum of `total_amount` over the rows of a revenue query
fn sum_revenue(rows: Vec<Value>) -> Result<(Decimal, i64), DatabaseError> {
    let mut total = Decimal::ZERO;
    let mut count = 0;
    for mut row in rows {
        let amount: Decimal = serde_json::from_value(row["total_amount"].take())?;
        total += amount;
        count += 1;
    }
    Ok((total, count))
}

/// Average of `total` over `count` orders, zero when there are none
pub fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(2)
}

fn verified_orders() -> Result<SelectQuery, DatabaseError> {
    SelectQuery::new(Table::Orders).where_clause(json!({ "payment_status": PaymentStatus::Verified.as_str() }))
}

pub struct PlatformStatsLoader {
    pub enabled: bool,
}

#[async_trait]
impl Loader for PlatformStatsLoader {
    type Output = Option<PlatformStats>;

    fn name(&self) -> &'static str {
        "platform_stats"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::Orders, Table::Restaurants, Table::Users]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Platform { enabled: self.enabled }
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Option<PlatformStats>, DatabaseError> {
        if *scope != Scope::Platform {
            return Ok(None);
        }
        let restaurants = Repository::<Restaurant>::new(store);
        let users = Repository::<User>::new(store);
        let orders = Repository::<Order>::new(store);

        let verified_query = verified_orders()?;
        let (total_restaurants, active_restaurants, total_users, total_orders, verified) = tokio::try_join!(
            restaurants.count(SelectQuery::new(Table::Restaurants)),
            restaurants.count(SelectQuery::new(Table::Restaurants).where_clause(json!({ "is_active": true }))?),
            users.count(SelectQuery::new(Table::Users)),
            orders.count(SelectQuery::new(Table::Orders)),
            store.select(&verified_query),
        )?;
        let (total_revenue, _) = sum_revenue(verified)?;

        Ok(Some(PlatformStats {
            total_restaurants,
            active_restaurants,
            total_users,
            total_orders,
            total_revenue,
        }))
    }
}

pub struct RestaurantStatsLoader;

#[async_trait]
impl Loader for RestaurantStatsLoader {
    type Output = Option<RestaurantStats>;

    fn name(&self) -> &'static str {
        "restaurant_stats"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::Orders, Table::MenuItems, Table::MenuCategories]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Tenant
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Option<RestaurantStats>, DatabaseError> {
        let Some(restaurant_id) = scope.restaurant() else {
            return Ok(None);
        };
        let orders = Repository::<Order>::new(store);
        let items = Repository::<MenuItem>::new(store);
        let categories = Repository::<Category>::new(store);

        let pending = orders.scoped(restaurant_id).where_clause(json!({
            "$or": [
                { "status": "PENDING" },
                { "payment_status": PaymentStatus::PendingVerification.as_str() },
            ]
        }))?;
        let verified_query = verified_orders()?.tenant(Order::TENANT_PATH, restaurant_id);
        let recent = orders
            .scoped(restaurant_id)
            .order("created_at desc")?
            .limit(RECENT_ORDERS)?;

        let (total_orders, pending_orders, verified, menu_items, category_count, recent_orders) = tokio::try_join!(
            orders.count(orders.scoped(restaurant_id)),
            orders.count(pending),
            store.select(&verified_query),
            items.count(items.scoped(restaurant_id)),
            categories.count(categories.scoped(restaurant_id)),
            orders.select_any(recent),
        )?;
        let (revenue, verified_count) = sum_revenue(verified)?;

        Ok(Some(RestaurantStats {
            total_orders,
            pending_orders,
            revenue,
            avg_order_value: average(revenue, verified_count),
            menu_items,
            categories: category_count,
            recent_orders,
        }))
    }
}

/// Platform totals for the super-admin dashboard
pub struct PlatformStatsHook {
    query: LiveQuery<PlatformStatsLoader>,
}

impl PlatformStatsHook {
    pub fn spawn(deps: LiveDeps, enabled: bool) -> Self {
        Self {
            query: LiveQuery::spawn(PlatformStatsLoader { enabled }, deps),
        }
    }
}

impl Deref for PlatformStatsHook {
    type Target = LiveQuery<PlatformStatsLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}

/// Figures for the scoped restaurant's dashboard
pub struct RestaurantStatsHook {
    query: LiveQuery<RestaurantStatsLoader>,
}

impl RestaurantStatsHook {
    pub fn spawn(deps: LiveDeps) -> Self {
        Self {
            query: LiveQuery::spawn(RestaurantStatsLoader, deps),
        }
    }
}

impl Deref for RestaurantStatsHook {
    type Target = LiveQuery<RestaurantStatsLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
