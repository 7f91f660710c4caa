use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::embedded;
use crate::config::ReviewVariant;
use crate::database::repository::{Entity, TenantEntity};
use crate::database::store::{Embed, TenantPath};
use crate::types::{RestaurantId, Table};

/// Fulfillment state.
///
/// `PENDING → CONFIRMED → PREPARING → READY → COMPLETED`, with `CANCELLED`
/// reachable from the first three. `COMPLETED` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Targets offered from this status
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Still being worked on by the kitchen
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    PendingVerification,
    Verified,
    Failed,
}

impl PaymentStatus {
    /// Only payments awaiting verification can be reviewed
    pub fn is_reviewable(self) -> bool {
        self == PaymentStatus::PendingVerification
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::PendingVerification => "PENDING_VERIFICATION",
            PaymentStatus::Verified => "VERIFIED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub name: Option<String>,
    pub phone: String,
}

/// Snapshot of a menu item taken when the order was placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub item_name: String,
    pub item_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub restaurant_id: RestaurantId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_address: Option<String>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embedded::one")]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Entity for Order {
    const TABLE: Table = Table::Orders;

    fn embeds() -> Vec<Embed> {
        vec![
            Embed::to_one("customer", Table::Customers, "customer_id", &["name", "phone"]),
            Embed::to_many(
                "items",
                Table::OrderItems,
                "order_id",
                &["id", "item_name", "item_price", "quantity", "subtotal"],
            ),
        ]
    }
}

impl TenantEntity for Order {
    const TENANT_PATH: TenantPath = TenantPath::Direct;
}

/// Named views over the order list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderFilter {
    #[default]
    All,
    /// Payment awaiting review
    PendingPayment,
    /// Not yet ready for pickup or delivery
    Active,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::PendingPayment => order.payment_status.is_reviewable(),
            OrderFilter::Active => order.status.is_active(),
        }
    }

    pub fn apply<'a>(&self, orders: &'a [Order]) -> Vec<&'a Order> {
        orders.iter().filter(|o| self.matches(o)).collect()
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all" => Some(OrderFilter::All),
            "pending-payment" => Some(OrderFilter::PendingPayment),
            "active" => Some(OrderFilter::Active),
            _ => None,
        }
    }
}

/// Outcome of a payment review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentReview {
    Verify,
    Reject,
}

/// Partial status change accepted by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

impl StatusUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            payment_status: None,
        }
    }

    /// Fields sent for a payment review; the backend owns any joint transition
    pub fn for_review(review: PaymentReview, variant: ReviewVariant) -> Self {
        match (variant, review) {
            (ReviewVariant::Payment, PaymentReview::Verify) => Self {
                status: None,
                payment_status: Some(PaymentStatus::Verified),
            },
            (ReviewVariant::Payment, PaymentReview::Reject) => Self {
                status: None,
                payment_status: Some(PaymentStatus::Failed),
            },
            (ReviewVariant::Paired, PaymentReview::Verify) => Self::status(OrderStatus::Confirmed),
            (ReviewVariant::Paired, PaymentReview::Reject) => Self::status(OrderStatus::Cancelled),
        }
    }

    /// Status targets must be legal from `current`
    pub fn is_legal_from(&self, current: OrderStatus) -> bool {
        self.status.map_or(true, |target| current.can_transition_to(target))
    }
}
