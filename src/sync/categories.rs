use std::ops::Deref;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::database::models::{non_blank, Category, CategoryForm};
use crate::database::repository::to_object;
use crate::database::{DataStore, DatabaseError, Repository};
use crate::error::AdminError;
use crate::types::{Scope, Table};

/// Display order: `sort_order`, ties by creation
pub const CATEGORY_ORDER: &str = "sort_order asc, created_at asc";

pub struct CategoriesLoader;

#[async_trait]
impl Loader for CategoriesLoader {
    type Output = Vec<Category>;

    fn name(&self) -> &'static str {
        "categories"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::MenuCategories]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Tenant
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Vec<Category>, DatabaseError> {
        let Some(restaurant_id) = scope.restaurant() else {
            return Ok(vec![]);
        };
        let repo = Repository::<Category>::new(store);
        repo.select_any(repo.scoped(restaurant_id).order(CATEGORY_ORDER)?).await
    }
}

/// Menu categories of the scoped restaurant
pub struct CategoriesHook {
    query: LiveQuery<CategoriesLoader>,
}

impl CategoriesHook {
    pub fn spawn(deps: LiveDeps) -> Self {
        Self {
            query: LiveQuery::spawn(CategoriesLoader, deps),
        }
    }

    /// The new category always belongs to the scoped restaurant
    pub async fn create(&self, form: CategoryForm) -> Result<Category, AdminError> {
        let restaurant_id = self.require_restaurant("create a category")?;
        validate(&form)?;

        let repo = Repository::<Category>::new(self.store());
        let created = repo
            .create(&json!({
                "name": form.name.trim(),
                "description": non_blank(form.description),
                "sort_order": form.sort_order,
                "is_active": true,
                "restaurant_id": restaurant_id,
                "updated_at": Utc::now(),
            }))
            .await?;
        self.reload().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, form: CategoryForm) -> Result<Category, AdminError> {
        let restaurant_id = self.require_restaurant("update a category")?;
        validate(&form)?;

        let patch = to_object(&json!({
            "name": form.name.trim(),
            "description": non_blank(form.description),
            "sort_order": form.sort_order,
            "updated_at": Utc::now(),
        }))?;
        let repo = Repository::<Category>::new(self.store());
        let updated = repo.update_scoped(&restaurant_id, id, patch).await?;
        self.reload().await;
        Ok(updated)
    }

    /// Flip `is_active`; the list is re-read whether or not the write succeeded
    pub async fn toggle_active(&self, category: &Category) -> Result<Category, AdminError> {
        let restaurant_id = self.require_restaurant("update a category")?;
        let patch = to_object(&json!({
            "is_active": !category.is_active,
            "updated_at": Utc::now(),
        }))?;
        let repo = Repository::<Category>::new(self.store());
        let result = repo.update_scoped(&restaurant_id, &category.id, patch).await;
        self.reload().await;
        Ok(result?)
    }
}

fn validate(form: &CategoryForm) -> Result<(), AdminError> {
    if form.name.trim().is_empty() {
        return Err(AdminError::field_error("name", "Category name is required"));
    }
    Ok(())
}

impl Deref for CategoriesHook {
    type Target = LiveQuery<CategoriesLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
