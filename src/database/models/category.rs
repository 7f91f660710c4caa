use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::{Entity, TenantEntity};
use crate::database::store::TenantPath;
use crate::types::{RestaurantId, Table};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub restaurant_id: RestaurantId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Category {
    const TABLE: Table = Table::MenuCategories;
}

impl TenantEntity for Category {
    const TENANT_PATH: TenantPath = TenantPath::Direct;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}
