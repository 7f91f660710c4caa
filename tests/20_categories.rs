mod common;

use anyhow::Result;
use serde_json::json;

use common::*;
use restaurant_admin::auth::AuthProvider;
use restaurant_admin::database::models::CategoryForm;
use restaurant_admin::database::ReadRecord;
use restaurant_admin::types::{RestaurantId, Table};
use restaurant_admin::AdminError;

fn form(name: &str, sort_order: i32) -> CategoryForm {
    CategoryForm {
        name: name.to_string(),
        description: None,
        sort_order,
    }
}

fn category_reads(h: &Harness) -> usize {
    h.store
        .reads()
        .iter()
        .filter(|r| r.table == Table::MenuCategories)
        .count()
}

#[tokio::test]
async fn created_category_belongs_to_the_session_restaurant() -> Result<()> {
    let h = Harness::start(R2_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;

    let created = categories.create(form("Drinks", 3)).await?;
    assert_eq!(created.restaurant_id, RestaurantId::new("r2"));
    assert!(created.is_active);

    let stored = h.store.find(Table::MenuCategories, &created.id).expect("stored row");
    assert_eq!(stored["restaurant_id"], "r2");

    let names: Vec<_> = categories.data().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["Soups", "Drinks", "Desserts"]);
    Ok(())
}

#[tokio::test]
async fn other_tenants_rows_never_leak_in() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;
    eventually(|| h.store.active_subscriptions().len() == 1).await?;

    // Written by another session under r2
    h.store.insert_now(
        Table::MenuCategories,
        json!({ "name": "Drinks", "description": null, "sort_order": 0, "is_active": true, "restaurant_id": "r2" }),
    );
    categories.create(form("Specials", 9)).await?;
    h.store.insert_now(
        Table::MenuCategories,
        json!({ "name": "Breakfast", "description": null, "sort_order": 0, "is_active": true, "restaurant_id": "r2" }),
    );
    settle().await;

    let data = categories.data();
    assert!(data.iter().all(|c| c.restaurant_id == RestaurantId::new("r1")));
    let names: Vec<_> = data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Mains", "Sides", "Specials"]);
    assert!(h
        .store
        .reads()
        .iter()
        .all(|r| r.table != Table::MenuCategories || r.restaurant_id == Some(RestaurantId::new("r1"))));
    Ok(())
}

#[tokio::test]
async fn blank_name_is_rejected_before_any_write() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;

    let err = categories.create(form("   ", 1)).await.unwrap_err();
    match err {
        AdminError::Validation { field_errors, .. } => {
            assert!(field_errors.map_or(false, |f| f.contains_key("name")))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.store.rows(Table::MenuCategories).len(), 4);
    Ok(())
}

#[tokio::test]
async fn updates_cannot_reach_another_restaurant() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;

    let err = categories.update("c3", form("Hijacked", 1)).await.unwrap_err();
    assert!(matches!(err, AdminError::Database(_)), "unexpected error: {err}");
    assert_eq!(err.error_code(), "NOT_FOUND");
    assert_eq!(h.store.find(Table::MenuCategories, "c3").unwrap()["name"], "Soups");

    let updated = categories.update("c2", form("Sides & Extras", 0)).await?;
    assert_eq!(updated.name, "Sides & Extras");
    let names: Vec<_> = categories.data().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["Sides & Extras", "Mains"]);
    Ok(())
}

#[tokio::test]
async fn toggle_flips_active_and_reloads() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    let loaded = within(categories.loaded()).await?;
    let mains = loaded.data.into_iter().find(|c| c.id == "c1").expect("c1");

    let toggled = categories.toggle_active(&mains).await?;
    assert!(!toggled.is_active);
    let reloaded = categories.data().into_iter().find(|c| c.id == "c1").expect("c1");
    assert!(!reloaded.is_active);
    Ok(())
}

#[tokio::test]
async fn bursts_of_changes_collapse_into_one_reload() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;
    eventually(|| h.store.active_subscriptions().len() == 1).await?;
    h.store.clear_reads();

    for n in 0..5 {
        h.store.insert_now(
            Table::MenuCategories,
            json!({ "name": format!("Batch {n}"), "description": null, "sort_order": 10 + n,
                    "is_active": true, "restaurant_id": "r1" }),
        );
    }
    let state = until(categories.subscribe(), |s| s.data.len() == 7).await?;
    assert_eq!(state.data.last().map(|c| c.name.as_str()), Some("Batch 4"));

    settle().await;
    assert_eq!(
        h.store.reads(),
        vec![ReadRecord {
            table: Table::MenuCategories,
            restaurant_id: Some(RestaurantId::new("r1")),
        }]
    );
    assert_eq!(category_reads(&h), 1);
    Ok(())
}

#[tokio::test]
async fn failed_reads_keep_the_last_good_data() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;
    eventually(|| h.store.active_subscriptions().len() == 1).await?;

    h.store.fail_reads(Some("connection reset"));
    h.store.update_now(Table::MenuCategories, "c1", json!({ "name": "Main Dishes" }));
    let state = until(categories.subscribe(), |s| s.error.is_some()).await?;
    assert!(state.error.unwrap().contains("connection reset"));
    assert!(!state.loading);
    assert_eq!(state.data.len(), 2);
    assert_eq!(state.data[0].name, "Mains");

    h.store.fail_reads(None);
    h.store.update_now(Table::MenuCategories, "c2", json!({ "name": "Side Dishes" }));
    let state = until(categories.subscribe(), |s| s.error.is_none() && s.data[0].name == "Main Dishes").await?;
    assert_eq!(state.data[1].name, "Side Dishes");
    Ok(())
}

#[tokio::test]
async fn equal_sort_order_falls_back_to_creation_time() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    within(categories.loaded()).await?;
    eventually(|| h.store.active_subscriptions().len() == 1).await?;

    // Inserted out of creation order
    for (name, sort_order, created) in [
        ("Stews", 4, "2024-02-03T00:00:00Z"),
        ("Grills", 7, "2024-01-15T00:00:00Z"),
        ("Rice", 4, "2024-02-01T00:00:00Z"),
    ] {
        h.store.insert_now(
            Table::MenuCategories,
            json!({ "name": name, "description": null, "sort_order": sort_order, "is_active": true,
                    "restaurant_id": "r1", "created_at": created }),
        );
    }

    let state = until(categories.subscribe(), |s| s.data.len() == 5).await?;
    let names: Vec<_> = state.data.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Mains", "Sides", "Rice", "Stews", "Grills"]);
    Ok(())
}

#[tokio::test]
async fn signed_out_admins_cannot_write_categories() -> Result<()> {
    let h = Harness::start(R1_ADMIN).await?;
    let categories = h.context.categories();
    let mains = within(categories.loaded())
        .await?
        .data
        .into_iter()
        .find(|c| c.id == "c1")
        .expect("c1");

    h.auth.sign_out();
    until(categories.subscribe(), |s| s.data.is_empty() && !s.loading).await?;

    let err = categories.create(form("Drinks", 3)).await.unwrap_err();
    assert!(matches!(err, AdminError::Unauthenticated), "unexpected error: {err}");
    let err = categories.toggle_active(&mains).await.unwrap_err();
    assert_eq!(err.error_code(), "UNAUTHENTICATED");
    assert_eq!(h.store.rows(Table::MenuCategories).len(), 4);
    Ok(())
}
