mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::*;
use restaurant_admin::database::models::{NewUser, RestaurantForm, Role, SubscriptionStatus};
use restaurant_admin::types::{RestaurantId, Scope, Table};
use restaurant_admin::AdminError;

fn restaurant_form(name: &str) -> RestaurantForm {
    RestaurantForm {
        name: name.to_string(),
        description: None,
        phone: "+233200000009".to_string(),
        email: Some("".to_string()),
        momo_number: "0240000009".to_string(),
        momo_name: "Waakye Joint".to_string(),
    }
}

fn order_reads_for(h: &Harness, restaurant: &str) -> usize {
    h.store
        .reads()
        .iter()
        .filter(|r| r.table == Table::Orders && r.restaurant_id == Some(RestaurantId::new(restaurant)))
        .count()
}

#[tokio::test]
async fn super_admin_orders_wait_for_a_restaurant_selection() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    h.store.clear_reads();

    let orders = h.context.orders();
    let state = within(orders.loaded()).await?;
    assert_eq!(state.scope, Scope::None);
    assert!(state.data.is_empty());
    assert!(matches!(orders.require_restaurant("view orders"), Err(AdminError::Unscoped(_))));
    settle().await;
    assert_eq!(h.store.read_count(), 0);
    assert!(h.store.active_subscriptions().is_empty());

    h.context.selector.select(Some("r1"))?;
    let state = until(orders.subscribe(), |s| {
        s.scope == Scope::Restaurant(RestaurantId::new("r1")) && !s.loading
    })
    .await?;
    assert_eq!(state.data.len(), 3);

    settle().await;
    assert_eq!(order_reads_for(&h, "r1"), 1);
    assert_eq!(h.store.read_count(), 1);
    assert_eq!(h.store.active_subscriptions(), vec!["orders:restaurant:r1".to_string()]);
    Ok(())
}

#[tokio::test]
async fn switching_restaurants_replaces_the_channel() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    h.context.selector.select(Some("r1"))?;
    let orders = h.context.orders();
    until(orders.subscribe(), |s| s.scope == Scope::Restaurant(RestaurantId::new("r1")) && !s.loading).await?;

    h.context.selector.select(Some("r2"))?;
    let state = until(orders.subscribe(), |s| {
        s.scope == Scope::Restaurant(RestaurantId::new("r2")) && !s.loading
    })
    .await?;
    assert_eq!(state.data.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["o4"]);
    assert_eq!(h.store.active_subscriptions(), vec!["orders:restaurant:r2".to_string()]);

    h.store.clear_reads();
    h.store.update_now(Table::Orders, "o1", json!({ "status": "CONFIRMED" }));
    settle().await;
    assert_eq!(order_reads_for(&h, "r1"), 0, "no reload for the closed restaurant");
    assert!(orders.data().iter().all(|o| o.restaurant_id == RestaurantId::new("r2")));

    h.context.selector.clear()?;
    until(orders.subscribe(), |s| s.scope == Scope::None && !s.loading).await?;
    eventually(|| h.store.active_subscriptions().is_empty()).await?;
    Ok(())
}

#[tokio::test]
async fn only_super_admins_may_switch_restaurants() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let err = h.context.selector.select(Some("r2")).unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    assert_eq!(h.context.selector.current(), None);

    let categories = h.context.categories();
    let state = within(categories.loaded()).await?;
    assert_eq!(state.scope, Scope::Restaurant(RestaurantId::new("r1")));
    Ok(())
}

#[tokio::test]
async fn dropping_a_hook_closes_its_channel() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let orders = h.context.orders();
    within(orders.loaded()).await?;
    assert_eq!(h.store.active_subscriptions().len(), 1);

    drop(orders);
    eventually(|| h.store.active_subscriptions().is_empty()).await?;
    Ok(())
}

#[tokio::test]
async fn restaurants_start_on_a_trial() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let restaurants = h.context.restaurants(true);
    let list = within(restaurants.loaded()).await?.data;
    let names: Vec<_> = list.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Closed Cafe", "Chop Bar", "Mama's Kitchen"]);

    let created = restaurants.create(restaurant_form("Waakye Joint")).await?;
    assert!(created.is_active);
    assert_eq!(created.subscription_status, SubscriptionStatus::Trial);
    assert_eq!(created.email, None);
    let trial_ends = created.trial_ends_at.expect("trial end");
    let expected = Utc::now() + Duration::days(30);
    assert!((trial_ends - expected).num_minutes().abs() < 5);

    assert_eq!(restaurants.data()[0].name, "Waakye Joint");

    let toggled = restaurants.toggle_active(&created).await?;
    assert!(!toggled.is_active);
    Ok(())
}

#[tokio::test]
async fn restaurant_creation_requires_contact_and_payout_details() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let restaurants = h.context.restaurants(true);
    within(restaurants.loaded()).await?;

    let mut form = restaurant_form("Waakye Joint");
    form.momo_number = " ".to_string();
    let err = restaurants.create(form).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(h.store.rows(Table::Restaurants).len(), 3);
    Ok(())
}

#[tokio::test]
async fn restaurant_admins_get_no_platform_data() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let restaurants = h.context.restaurants(true);
    let users = h.context.users(true);

    assert!(within(restaurants.loaded()).await?.data.is_empty());
    assert!(within(users.loaded()).await?.data.users.is_empty());

    let err = restaurants.create(restaurant_form("Rogue")).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    assert_eq!(h.store.rows(Table::Restaurants).len(), 3);
    Ok(())
}

#[tokio::test]
async fn user_directory_lists_users_and_assignable_restaurants() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let users = h.context.users(true);
    let directory = within(users.loaded()).await?.data;

    let ids: Vec<_> = directory.users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec![R2_ADMIN, R1_ADMIN, SUPER_ADMIN]);
    let kojo = &directory.users[0];
    assert_eq!(kojo.restaurant.as_ref().map(|r| r.name.as_str()), Some("Chop Bar"));

    let picker: Vec<_> = directory.restaurants.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(picker, vec!["Chop Bar", "Mama's Kitchen"]);
    Ok(())
}

#[tokio::test]
async fn provisioning_goes_through_the_backend() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let store = h.store.clone();
    h.backend.on_request(move |request| {
        if request.method == "POST" && request.path == "/api/admin/users" {
            store.insert_now(
                Table::Users,
                json!({ "id": "u-new", "email": request.body["email"], "phone": request.body["phone"],
                        "name": request.body["name"], "role": request.body["role"],
                        "restaurant_id": request.body["restaurantId"], "is_active": true }),
            );
        }
    });
    h.backend.respond_with(201, json!({ "id": "u-new" }));

    let users = h.context.users(true);
    within(users.loaded()).await?;

    let created = users
        .create_user(NewUser {
            name: "Abena".to_string(),
            email: Some("abena@example.com".to_string()),
            phone: Some("".to_string()),
            password: "s3cret!".to_string(),
            role: Role::RestaurantAdmin,
            restaurant_id: Some(RestaurantId::new("r2")),
        })
        .await?;
    assert_eq!(created["id"], "u-new");

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        json!({ "name": "Abena", "email": "abena@example.com", "password": "s3cret!",
                "role": "RESTAURANT_ADMIN", "restaurantId": "r2" })
    );
    assert!(users.data().users.iter().any(|u| u.id == "u-new"));
    Ok(())
}

#[tokio::test]
async fn provisioning_validation_happens_before_the_request() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let users = h.context.users(true);
    within(users.loaded()).await?;

    let err = users
        .create_user(NewUser {
            name: "Yaw".to_string(),
            email: None,
            phone: Some("+233244445555".to_string()),
            password: "s3cret!".to_string(),
            role: Role::RestaurantAdmin,
            restaurant_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert!(h.backend.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn promoting_a_user_clears_the_restaurant_binding() -> Result<()> {
    let h = Harness::start(SUPER_ADMIN).await?;
    let users = h.context.users(true);
    within(users.loaded()).await?;

    users
        .update_role(R1_ADMIN, Role::SuperAdmin, Some(RestaurantId::new("r1")))
        .await?;

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, format!("/api/admin/users/{}/role", R1_ADMIN));
    assert_eq!(requests[0].body, json!({ "role": "SUPER_ADMIN", "restaurantId": Value::Null }));
    Ok(())
}
