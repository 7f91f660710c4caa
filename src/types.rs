/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tables the admin layer reads, writes or watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Restaurants,
    Users,
    MenuCategories,
    MenuItems,
    Orders,
    OrderItems,
    Customers,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Restaurants,
        Table::Users,
        Table::MenuCategories,
        Table::MenuItems,
        Table::Orders,
        Table::OrderItems,
        Table::Customers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Restaurants => "restaurants",
            Table::Users => "users",
            Table::MenuCategories => "menu_categories",
            Table::MenuItems => "menu_items",
            Table::Orders => "orders",
            Table::OrderItems => "order_items",
            Table::Customers => "customers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Row-level change kinds delivered by a change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Parse a trigger operation name (`TG_OP`)
    pub fn from_op(op: &str) -> Option<Self> {
        match op.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// Restaurant identifier, the tenant key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(String);

impl RestaurantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Interpret a picker value: blank selections mean "nothing selected"
    pub fn from_selection(value: Option<&str>) -> Option<Self> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RestaurantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RestaurantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Effective data scope of a live query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Nothing may be read: no session, no role mapping, or nothing selected
    #[default]
    None,
    /// One tenant
    Restaurant(RestaurantId),
    /// Platform-wide listings, super-admin only
    Platform,
}

impl Scope {
    pub fn restaurant(&self) -> Option<&RestaurantId> {
        match self {
            Scope::Restaurant(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Scope::None)
    }

    /// Stable key used for channel names and read logs
    pub fn key(&self) -> String {
        match self {
            Scope::None => "none".to_string(),
            Scope::Platform => "platform".to_string(),
            Scope::Restaurant(id) => format!("restaurant:{}", id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.key())
    }
}
