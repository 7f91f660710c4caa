use anyhow::anyhow;
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::database::models::MenuItemForm;
use crate::sync::MenuCatalog;

#[derive(Subcommand)]
pub enum MenuCommands {
    #[command(about = "List menu items grouped by category")]
    List,

    #[command(about = "Create a menu item")]
    Create {
        #[arg(help = "Item name")]
        name: String,
        #[arg(help = "Price, e.g. 35.00")]
        price: Decimal,
        #[arg(long, help = "Category ID")]
        category: String,
        #[arg(long, help = "Description")]
        description: Option<String>,
        #[arg(long, help = "Image URL")]
        image_url: Option<String>,
        #[arg(long, default_value_t = 0, help = "Position within the category")]
        sort_order: i32,
    },

    #[command(about = "Mark a menu item available or unavailable")]
    Toggle {
        #[arg(help = "Menu item ID")]
        id: String,
    },
}

pub async fn handle(cmd: MenuCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    let hook = runtime.context.menu_items();
    match cmd {
        MenuCommands::List => {
            let (catalog, scope) = loaded(&hook).await?;
            if catalog.items.is_empty() {
                return output_empty_collection(&output_format, "items", &format!("No menu items for {}", scope));
            }
            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "items": catalog.items,
                            "categories": catalog.categories,
                        }))?
                    );
                }
                OutputFormat::Text => print_catalog(&catalog),
            }
            Ok(())
        }
        MenuCommands::Create { name, price, category, description, image_url, sort_order } => {
            let form = MenuItemForm {
                name,
                description,
                price,
                category_id: category,
                image_url,
                sort_order,
            };
            let created = hook.create(form).await?;
            output_success(
                &output_format,
                &format!("Created '{}' at {}", created.name, format_price(created.price)),
                Some(json!({ "item": created })),
            )
        }
        MenuCommands::Toggle { id } => {
            let (catalog, _) = loaded(&hook).await?;
            let item = catalog
                .items
                .into_iter()
                .find(|i| i.id == id)
                .ok_or_else(|| anyhow!("Menu item '{}' not found", id))?;
            let updated = hook.toggle_available(&item).await?;
            output_success(
                &output_format,
                &format!(
                    "'{}' is now {}",
                    updated.name,
                    if updated.is_available { "available" } else { "unavailable" }
                ),
                Some(json!({ "item": updated })),
            )
        }
    }
}

fn print_catalog(catalog: &MenuCatalog) {
    for category in &catalog.categories {
        let items = catalog.items_in(&category.id);
        println!("{} ({} items){}", category.name, items.len(), if category.is_active { "" } else { " [inactive]" });
        for item in items {
            println!(
                "  {:<38} {:<28} {:>12} {}",
                item.id,
                item.name,
                format_price(item.price),
                if item.is_available { "" } else { "unavailable" }
            );
        }
    }
}
