use std::ops::Deref;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::live::{LiveDeps, LiveQuery, Loader};
use super::scope::ScopePolicy;
use crate::backend::BackendClient;
use crate::database::models::{non_blank, NewUser, Restaurant, Role, RoleUpdate, User};
use crate::database::{DataStore, DatabaseError, Repository};
use crate::error::AdminError;
use crate::types::{RestaurantId, Scope, Table};

/// Platform users plus the restaurants they can be bound to
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    pub users: Vec<User>,
    /// Active restaurants, by name
    pub restaurants: Vec<Restaurant>,
}

pub struct UsersLoader {
    pub enabled: bool,
}

#[async_trait]
impl Loader for UsersLoader {
    type Output = UserDirectory;

    fn name(&self) -> &'static str {
        "users"
    }

    fn tables(&self) -> &'static [Table] {
        &[Table::Users]
    }

    fn policy(&self) -> ScopePolicy {
        ScopePolicy::Platform { enabled: self.enabled }
    }

    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<UserDirectory, DatabaseError> {
        if *scope != Scope::Platform {
            return Ok(UserDirectory::default());
        }
        let users = Repository::<User>::new(store);
        let restaurants = Repository::<Restaurant>::new(store);
        let (users, restaurants) = tokio::try_join!(
            users.select_any(users.query().order("created_at desc")?),
            restaurants.select_any(
                restaurants
                    .query()
                    .where_clause(json!({ "is_active": true }))?
                    .order("name asc")?
            ),
        )?;
        Ok(UserDirectory { users, restaurants })
    }
}

/// Platform user management; provisioning and role changes go through the
/// backend because they create or modify authentication identities
pub struct UsersHook {
    query: LiveQuery<UsersLoader>,
    backend: BackendClient,
}

impl UsersHook {
    pub fn spawn(deps: LiveDeps, enabled: bool, backend: BackendClient) -> Self {
        Self {
            query: LiveQuery::spawn(UsersLoader { enabled }, deps),
            backend,
        }
    }

    pub async fn create_user(&self, mut user: NewUser) -> Result<Value, AdminError> {
        self.require_platform("create users")?;
        user.email = non_blank(user.email);
        user.phone = non_blank(user.phone);
        if user.role == Role::SuperAdmin {
            user.restaurant_id = None;
        }
        user.validate()?;

        let created = self.backend.create_user(&user).await?;
        info!("Provisioned {} user {}", user.role, user.name);
        self.reload().await;
        Ok(created)
    }

    pub async fn update_role(&self, user_id: &str, role: Role, restaurant_id: Option<RestaurantId>) -> Result<(), AdminError> {
        self.require_platform("change user roles")?;
        let update = RoleUpdate::new(role, restaurant_id)?;
        self.backend.update_user_role(user_id, &update).await?;
        info!("User {} is now {}", user_id, role);
        self.reload().await;
        Ok(())
    }
}

impl Deref for UsersHook {
    type Target = LiveQuery<UsersLoader>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}
