use std::ops::Deref;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::categories::CATEGORY_ORDER;
use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::database::models::{non_blank, Category, MenuItem, MenuItemForm};
use crate::database::repository::to_object;
use crate::database::{DataStore, DatabaseError, Repository};
use crate::error::AdminError;
use crate::types::{RestaurantId, Scope, Table};

/// Items plus the categories they can be filed under
#[derive(Debug, Clone, Default, Serialize)]
pub struct MenuCatalog {
    pub items: Vec<MenuItem>,
    pub categories: Vec<Category>,
}

impl MenuCatalog {
    pub fn items_in(&self, category_id: &str) -> Vec<&MenuItem> {
        self.items.iter().filter(|i| i.category_id == category_id).collect()
    }
}

pub struct MenuItemsLoader;

#[async_trait]
impl Loader for MenuItemsLoader {
    type Output = MenuCatalog;

    fn name(&self) -> &'static str {
        "menu_items"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::MenuItems]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Tenant
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<MenuCatalog, DatabaseError> {
        let Some(restaurant_id) = scope.restaurant() else {
            return Ok(MenuCatalog::default());
        };
        let items = Repository::<MenuItem>::new(store);
        let categories = Repository::<Category>::new(store);
        let (items, categories) = tokio::try_join!(
            items.select_any(items.scoped(restaurant_id).order("sort_order asc, created_at asc")?),
            categories.select_any(categories.scoped(restaurant_id).order(CATEGORY_ORDER)?),
        )?;
        Ok(MenuCatalog { items, categories })
    }
}

/// Menu items of the scoped restaurant, joined through their categories
pub struct MenuItemsHook {
    query: LiveQuery<MenuItemsLoader>,
}

impl MenuItemsHook {
    pub fn spawn(deps: LiveDeps) -> Self {
        Self {
            query: LiveQuery::spawn(MenuItemsLoader, deps),
        }
    }

    pub async fn create(&self, form: MenuItemForm) -> Result<MenuItem, AdminError> {
        let restaurant_id = self.require_restaurant("create a menu item")?;
        validate(&form)?;
        self.ensure_category(&restaurant_id, &form.category_id).await?;

        let mut row = item_fields(form)?;
        row.insert("is_available".to_string(), Value::Bool(true));
        let created = Repository::<MenuItem>::new(self.store()).create(&row).await?;
        self.reload().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, form: MenuItemForm) -> Result<MenuItem, AdminError> {
        let restaurant_id = self.require_restaurant("update a menu item")?;
        validate(&form)?;
        self.ensure_category(&restaurant_id, &form.category_id).await?;

        let patch = item_fields(form)?;
        let updated = Repository::<MenuItem>::new(self.store())
            .update_scoped(&restaurant_id, id, patch)
            .await?;
        self.reload().await;
        Ok(updated)
    }

    /// Flip `is_available`; the list is re-read whether or not the write succeeded
    pub async fn toggle_available(&self, item: &MenuItem) -> Result<MenuItem, AdminError> {
        let restaurant_id = self.require_restaurant("update a menu item")?;
        let patch = to_object(&json!({
            "is_available": !item.is_available,
            "updated_at": Utc::now(),
        }))?;
        let result = Repository::<MenuItem>::new(self.store())
            .update_scoped(&restaurant_id, &item.id, patch)
            .await;
        self.reload().await;
        Ok(result?)
    }

    /// The target category must belong to the scoped restaurant
    async fn ensure_category(&self, restaurant_id: &RestaurantId, category_id: &str) -> Result<(), AdminError> {
        let repo = Repository::<Category>::new(self.store());
        let query = repo.scoped(restaurant_id).where_clause(json!({ "id": category_id }))?;
        match repo.count(query).await? {
            0 => Err(AdminError::field_error(
                "category_id",
                format!("Category {} does not belong to this restaurant", category_id),
            )),
            _ => Ok(()),
        }
    }
}

fn validate(form: &MenuItemForm) -> Result<(), AdminError> {
    if form.name.trim().is_empty() {
        return Err(AdminError::field_error("name", "Item name is required"));
    }
    if form.price < Decimal::ZERO {
        return Err(AdminError::field_error("price", "Price cannot be negative"));
    }
    if form.category_id.trim().is_empty() {
        return Err(AdminError::field_error("category_id", "Category is required"));
    }
    Ok(())
}

fn item_fields(form: MenuItemForm) -> Result<Map<String, Value>, AdminError> {
    Ok(to_object(&json!({
        "name": form.name.trim(),
        "description": non_blank(form.description),
        "price": form.price,
        "category_id": form.category_id,
        "image_url": non_blank(form.image_url),
        "sort_order": form.sort_order,
        "updated_at": Utc::now(),
    }))?)
}

impl Deref for MenuItemsHook {
    type Target = LiveQuery<MenuItemsLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
