use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::types::{RestaurantId, Table};

/// Billing state of a restaurant; values outside the known set are kept as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Trial => "TRIAL",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Suspended => "SUSPENDED",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Other(s) => s,
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "TRIAL" => SubscriptionStatus::Trial,
            "ACTIVE" => SubscriptionStatus::Active,
            "SUSPENDED" => SubscriptionStatus::Suspended,
            "CANCELLED" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Other(value),
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(value: SubscriptionStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub momo_number: String,
    pub momo_name: String,
    pub is_active: bool,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Restaurant {
    const TABLE: Table = Table::Restaurants;
}

/// Fields an operator edits when creating or updating a restaurant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestaurantForm {
    pub name: String,
    pub description: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub momo_number: String,
    pub momo_name: String,
}
