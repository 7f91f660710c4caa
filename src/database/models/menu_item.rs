use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::embedded;
use crate::database::repository::{Entity, TenantEntity};
use crate::database::store::{Embed, TenantPath};
use crate::types::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// Menu item; its restaurant is the restaurant of its category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embedded::one")]
    pub category: Option<CategoryRef>,
}

impl Entity for MenuItem {
    const TABLE: Table = Table::MenuItems;

    fn embeds() -> Vec<Embed> {
        vec![Embed::to_one("category", Table::MenuCategories, "category_id", &["id", "name"])]
    }
}

impl TenantEntity for MenuItem {
    const TENANT_PATH: TenantPath = TenantPath::ViaCategory;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuItemForm {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: String,
    pub image_url: Option<String>,
    pub sort_order: i32,
}
