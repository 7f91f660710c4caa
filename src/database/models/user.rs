use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::embedded;
use crate::database::repository::Entity;
use crate::database::store::Embed;
use crate::error::AdminError;
use crate::types::{RestaurantId, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    RestaurantAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::RestaurantAdmin => "RESTAURANT_ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "RESTAURANT_ADMIN" => Some(Role::RestaurantAdmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRef {
    pub id: RestaurantId,
    pub name: String,
}

/// Row of the role-mapping table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: String,
    pub role: Role,
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "embedded::one")]
    pub restaurant: Option<RestaurantRef>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Restaurant binding; only meaningful for restaurant admins
    pub fn bound_restaurant(&self) -> Option<&RestaurantId> {
        match self.role {
            Role::RestaurantAdmin => self.restaurant_id.as_ref().filter(|id| !id.as_str().is_empty()),
            Role::SuperAdmin => None,
        }
    }
}

impl Entity for User {
    const TABLE: Table = Table::Users;

    fn embeds() -> Vec<Embed> {
        vec![Embed::to_one("restaurant", Table::Restaurants, "restaurant_id", &["id", "name"])]
    }
}

/// Provisioning request sent to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<RestaurantId>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AdminError> {
        if self.name.trim().is_empty() {
            return Err(AdminError::field_error("name", "Name is required"));
        }
        let has = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if !has(&self.email) && !has(&self.phone) {
            return Err(AdminError::field_error("email", "Either email or phone is required"));
        }
        if self.password.is_empty() {
            return Err(AdminError::field_error("password", "Password is required"));
        }
        if self.role == Role::RestaurantAdmin && self.restaurant_id.is_none() {
            return Err(AdminError::field_error(
                "restaurantId",
                "A restaurant is required for restaurant admins",
            ));
        }
        Ok(())
    }
}

/// Role change sent to the backend; `restaurantId` is null for super-admins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    pub role: Role,
    pub restaurant_id: Option<RestaurantId>,
}

impl RoleUpdate {
    pub fn new(role: Role, restaurant_id: Option<RestaurantId>) -> Result<Self, AdminError> {
        match role {
            Role::RestaurantAdmin if restaurant_id.is_none() => Err(AdminError::field_error(
                "restaurantId",
                "A restaurant is required for restaurant admins",
            )),
            Role::RestaurantAdmin => Ok(Self { role, restaurant_id }),
            Role::SuperAdmin => Ok(Self { role, restaurant_id: None }),
        }
    }
}
