mod common;

use std::sync::Arc;

use anyhow::Result;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use common::*;
use restaurant_admin::auth::{AuthProvider, GuardStatus, SessionState};
use restaurant_admin::database::models::{CategoryForm, Role};
use restaurant_admin::types::{RestaurantId, Scope, Table};
use restaurant_admin::AdminError;

#[tokio::test]
async fn restaurant_admin_resolves_to_bound_restaurant() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;

    let state = h.context.session.current();
    let principal = state.principal().expect("resolved principal");
    assert_eq!(principal.role, Role::RestaurantAdmin);
    assert_eq!(principal.restaurant_id, Some(RestaurantId::new("r1")));

    let categories = h.context.categories();
    let loaded = within(categories.loaded()).await?;
    assert_eq!(loaded.scope, Scope::Restaurant(RestaurantId::new("r1")));
    let names: Vec<_> = loaded.data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Mains", "Sides"]);
    Ok(())
}

#[tokio::test]
async fn role_claims_in_the_token_are_ignored() -> Result<()> {
    let h = Harness::start(R2_ADMIN).await?;

    let forged = encode(
        &Header::default(),
        &json!({
            "sub": R1_ADMIN,
            "exp": (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp(),
            "role": "SUPER_ADMIN",
            "restaurant_id": "r2",
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )?;
    h.auth.sign_in(&forged)?;

    let mut rx = h.context.session.subscribe();
    let state = within(rx.wait_for(|s| matches!(s, SessionState::Resolved(p) if p.id == R1_ADMIN)))
        .await??
        .clone();
    let principal = state.principal().expect("resolved principal");
    assert_eq!(principal.role, Role::RestaurantAdmin);
    assert_eq!(principal.restaurant_id, Some(RestaurantId::new("r1")));
    Ok(())
}

#[tokio::test]
async fn unmapped_principal_has_no_scope() -> Result<()> {
    let h = Harness::start(UNMAPPED).await?;

    let state = h.context.session.current();
    let principal = state.principal().expect("resolved principal");
    assert_eq!(principal.role, Role::RestaurantAdmin);
    assert_eq!(principal.restaurant_id, None);

    h.store.clear_reads();
    let categories = h.context.categories();
    let orders = h.context.orders();
    let menu = h.context.menu_items();

    let loaded = within(categories.loaded()).await?;
    assert_eq!(loaded.scope, Scope::None);
    assert!(loaded.data.is_empty());
    assert!(within(orders.loaded()).await?.data.is_empty());
    assert!(within(menu.loaded()).await?.data.items.is_empty());

    let err = categories
        .create(CategoryForm {
            name: "Drinks".to_string(),
            description: None,
            sort_order: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Unscoped(_)), "unexpected error: {err}");

    settle().await;
    assert_eq!(h.store.read_count(), 0, "no store reads without a scope");
    assert!(h.store.active_subscriptions().is_empty());
    assert_eq!(h.store.rows(Table::MenuCategories).len(), 4);
    Ok(())
}

#[tokio::test]
async fn guard_redirects_restaurant_admins_once() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let navigator = Arc::new(RecordingNavigator::default());

    let guard = h.context.guard(navigator.clone());
    assert_eq!(guard.wait().await, GuardStatus::Denied);
    assert_eq!(guard.evaluate(), GuardStatus::Denied);
    assert_eq!(guard.clone().evaluate(), GuardStatus::Denied);
    assert!(!guard.is_ready());
    assert_eq!(navigator.paths(), vec!["/dashboard".to_string()]);
    Ok(())
}

#[tokio::test]
async fn guard_admits_super_admins() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let navigator = Arc::new(RecordingNavigator::default());

    let guard = h.context.guard(navigator.clone());
    assert_eq!(guard.wait().await, GuardStatus::Allowed);
    assert!(guard.is_ready());
    assert!(!guard.is_loading());
    assert!(navigator.paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn signing_out_clears_scope_without_redirect() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let navigator = Arc::new(RecordingNavigator::default());
    let categories = h.context.categories();
    within(categories.loaded()).await?;

    h.auth.sign_out();
    let state = until(categories.subscribe(), |s| s.scope == Scope::None && !s.loading).await?;
    assert!(state.data.is_empty());
    eventually(|| h.store.active_subscriptions().is_empty()).await?;

    assert_eq!(h.context.session.current(), SessionState::Unauthenticated);
    let guard = h.context.guard(navigator.clone());
    assert_eq!(guard.evaluate(), GuardStatus::Denied);
    assert!(navigator.paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn token_refresh_keeps_the_loaded_scope() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;

    let mut rx = categories.subscribe();
    rx.borrow_and_update();
    let mut session = h.context.session.subscribe();
    session.borrow_and_update();

    h.auth.sign_in(&mint_token(R1_ADMIN)?)?;
    settle().await;

    assert!(!session.has_changed()?, "a refresh for the same principal must not pass through Resolving");
    assert!(!rx.has_changed()?);
    assert_eq!(categories.data().len(), 2);
    assert_eq!(h.auth.session().map(|s| s.principal_id), Some(R1_ADMIN.to_string()));
    Ok(())
}

#[tokio::test]
async fn signing_in_as_another_admin_moves_every_hook() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;
    eventually(|| h.store.active_subscriptions() == vec!["menu_categories:restaurant:r1".to_string()]).await?;

    h.auth.sign_in(&mint_token(R2_ADMIN)?)?;
    let state = until(categories.subscribe(), |s| {
        s.scope == Scope::Restaurant(RestaurantId::new("r2")) && !s.loading
    })
    .await?;
    let names: Vec<_> = state.data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Soups", "Desserts"]);
    eventually(|| h.store.active_subscriptions() == vec!["menu_categories:restaurant:r2".to_string()]).await?;
    Ok(())
}
