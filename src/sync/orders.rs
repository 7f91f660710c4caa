use std::collections::HashSet;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::backend::BackendClient;
use crate::config::ReviewVariant;
use crate::database::models::{Order, OrderFilter, OrderStatus, PaymentReview, StatusUpdate};
use crate::database::{DataStore, DatabaseError, Repository};
use crate::error::AdminError;
use crate::types::{Scope, Table};

pub struct OrdersLoader;

#[async_trait]
impl Loader for OrdersLoader {
    type Output = Vec<Order>;

    fn name(&self) -> &'static str {
        "orders"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::Orders]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Tenant
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Vec<Order>, DatabaseError> {
        let Some(restaurant_id) = scope.restaurant() else {
            return Ok(vec![]);
        };
        let repo = Repository::<Order>::new(store);
        repo.select_any(repo.scoped(restaurant_id).order("created_at desc")?).await
    }
}

/// Orders currently being transitioned; at most one request per order
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

struct InFlightGuard {
    set: InFlight,
    order_id: String,
}

impl InFlight {
    fn acquire(&self, order_id: &str) -> Result<InFlightGuard, AdminError> {
        let mut set = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(order_id.to_string()) {
            return Err(AdminError::TransitionInFlight(order_id.to_string()));
        }
        Ok(InFlightGuard {
            set: self.clone(),
            order_id: order_id.to_string(),
        })
    }

    fn contains(&self, order_id: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(order_id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.set.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.order_id);
    }
}

/// Orders of the scoped restaurant, newest first.
///
/// Transitions go through the backend, which validates them and notifies the
/// customer; the list is re-read after every accepted transition.
pub struct OrdersHook {
    query: LiveQuery<OrdersLoader>,
    backend: BackendClient,
    review_variant: ReviewVariant,
    in_flight: InFlight,
}

impl OrdersHook {
    pub fn spawn(deps: LiveDeps, backend: BackendClient, review_variant: ReviewVariant) -> Self {
        Self {
            query: LiveQuery::spawn(OrdersLoader, deps),
            backend,
            review_variant,
            in_flight: InFlight::default(),
        }
    }

    /// Orders in the given view
    pub fn filtered(&self, filter: OrderFilter) -> Vec<Order> {
        self.data().into_iter().filter(|o| filter.matches(o)).collect()
    }

    /// Whether a transition for `order_id` is awaiting the backend
    pub fn is_pending(&self, order_id: &str) -> bool {
        self.in_flight.contains(order_id)
    }

    /// Move an order to `target`; illegal targets never reach the backend
    pub async fn advance(&self, order: &Order, target: OrderStatus) -> Result<(), AdminError> {
        self.require_restaurant("update an order")?;
        if !order.status.can_transition_to(target) {
            return Err(AdminError::invalid_transition(format!(
                "Order {} cannot move from {} to {}",
                order.order_number, order.status, target
            )));
        }
        self.submit(order, StatusUpdate::status(target)).await
    }

    /// Verify or reject a payment awaiting verification
    pub async fn review_payment(&self, order: &Order, review: PaymentReview) -> Result<(), AdminError> {
        self.require_restaurant("review a payment")?;
        if !order.payment_status.is_reviewable() {
            return Err(AdminError::invalid_transition(format!(
                "Payment for order {} is {}, not awaiting verification",
                order.order_number, order.payment_status
            )));
        }
        let update = StatusUpdate::for_review(review, self.review_variant);
        if !update.is_legal_from(order.status) {
            return Err(AdminError::invalid_transition(format!(
                "Order {} cannot be {} while {}",
                order.order_number,
                match review {
                    PaymentReview::Verify => "confirmed",
                    PaymentReview::Reject => "cancelled",
                },
                order.status
            )));
        }
        self.submit(order, update).await
    }

    async fn submit(&self, order: &Order, update: StatusUpdate) -> Result<(), AdminError> {
        let _guard = self.in_flight.acquire(&order.id)?;
        self.backend.update_order_status(&order.id, &update).await?;
        info!("Order {} transition accepted: {:?}", order.order_number, update);
        self.reload().await;
        Ok(())
    }
}

impl Deref for OrdersHook {
    type Target = LiveQuery<OrdersLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
