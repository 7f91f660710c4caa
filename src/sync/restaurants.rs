use std::ops::Deref;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::database::models::{non_blank, Restaurant, RestaurantForm, SubscriptionStatus};
use crate::database::repository::to_object;
use crate::database::{DataStore, DatabaseError, Repository};
use crate::error::AdminError;
use crate::types::{Scope, Table};

pub struct RestaurantsLoader {
    pub enabled: bool,
}

#[async_trait]
impl Loader for RestaurantsLoader {
    type Output = Vec<Restaurant>;

    fn name(&self) -> &'static str {
        "restaurants"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::Restaurants]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Platform { enabled: self.enabled }
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Vec<Restaurant>, DatabaseError> {
        if *scope != Scope::Platform {
            return Ok(vec![]);
        }
        let repo = Repository::<Restaurant>::new(store);
        repo.select_any(repo.query().order("created_at desc")?).await
    }
}

/// Platform-wide restaurant listing for super-admins
pub struct RestaurantsHook {
    query: LiveQuery<RestaurantsLoader>,
    trial_days: i64,
}

impl RestaurantsHook {
    pub fn spawn(deps: LiveDeps, enabled: bool, trial_days: i64) -> Self {
        Self {
            query: LiveQuery::spawn(RestaurantsLoader { enabled }, deps),
            trial_days,
        }
    }

    /// New restaurants start active, on a trial of the configured length
    pub async fn create(&self, form: RestaurantForm) -> Result<Restaurant, AdminError> {
        self.require_platform("create restaurants")?;
        validate(&form)?;

        let mut row = form_fields(form)?;
        row.insert("is_active".to_string(), json!(true));
        row.insert("subscription_status".to_string(), json!(SubscriptionStatus::Trial));
        row.insert(
            "trial_ends_at".to_string(),
            json!(Utc::now() + Duration::days(self.trial_days)),
        );

        let created = Repository::<Restaurant>::new(self.store()).create(&row).await?;
        self.reload().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, form: RestaurantForm) -> Result<Restaurant, AdminError> {
        self.require_platform("update restaurants")?;
        validate(&form)?;

        let updated = Repository::<Restaurant>::new(self.store())
            .update(id, form_fields(form)?)
            .await?;
        self.reload().await;
        Ok(updated)
    }

    /// Flip `is_active`; the list is re-read whether or not the write succeeded
    pub async fn toggle_active(&self, restaurant: &Restaurant) -> Result<Restaurant, AdminError> {
        self.require_platform("update restaurants")?;
        let patch = to_object(&json!({
            "is_active": !restaurant.is_active,
            "updated_at": Utc::now(),
        }))?;
        let result = Repository::<Restaurant>::new(self.store())
            .update(restaurant.id.as_str(), patch)
            .await;
        self.reload().await;
        Ok(result?)
    }
}

fn validate(form: &RestaurantForm) -> Result<(), AdminError> {
    let required = [
        ("name", &form.name, "Restaurant name is required"),
        ("phone", &form.phone, "Phone is required"),
        ("momo_number", &form.momo_number, "Mobile money number is required"),
        ("momo_name", &form.momo_name, "Mobile money account name is required"),
    ];
    for (field, value, message) in required {
        if value.trim().is_empty() {
            return Err(AdminError::field_error(field, message));
        }
    }
    Ok(())
}

fn form_fields(form: RestaurantForm) -> Result<serde_json::Map<String, serde_json::Value>, AdminError> {
    Ok(to_object(&json!({
        "name": form.name.trim(),
        "description": non_blank(form.description),
        "phone": form.phone.trim(),
        "email": non_blank(form.email),
        "momo_number": form.momo_number.trim(),
        "momo_name": form.momo_name.trim(),
        "updated_at": Utc::now(),
    }))?)
}

impl Deref for RestaurantsHook {
    type Target = LiveQuery<RestaurantsLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
