use anyhow::anyhow;
use clap::Subcommand;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::database::models::{Category, CategoryForm};

#[derive(Subcommand)]
pub enum CategoryCommands {
    #[command(about = "List categories in display order")]
    List,

    #[command(about = "Create a category")]
    Create {
        #[arg(help = "Category name")]
        name: String,
        #[arg(long, help = "Description")]
        description: Option<String>,
        #[arg(long, default_value_t = 0, help = "Position in the menu")]
        sort_order: i32,
    },

    #[command(about = "Update a category")]
    Update {
        #[arg(help = "Category ID")]
        id: String,
        #[arg(help = "Category name")]
        name: String,
        #[arg(long, help = "Description")]
        description: Option<String>,
        #[arg(long, default_value_t = 0, help = "Position in the menu")]
        sort_order: i32,
    },

    #[command(about = "Activate or deactivate a category")]
    Toggle {
        #[arg(help = "Category ID")]
        id: String,
    },
}

pub async fn handle(cmd: CategoryCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    let hook = runtime.context.categories();
    match cmd {
        CategoryCommands::List => {
            let (categories, scope) = loaded(&hook).await?;
            if categories.is_empty() {
                return output_empty_collection(&output_format, "categories", &format!("No categories for {}", scope));
            }
            match output_format {
                OutputFormat::Json => output_json("categories", &categories)?,
                OutputFormat::Text => print_categories(&categories),
            }
            Ok(())
        }
        CategoryCommands::Create { name, description, sort_order } => {
            let created = hook.create(CategoryForm { name, description, sort_order }).await?;
            output_success(
                &output_format,
                &format!("Created category '{}' ({})", created.name, created.id),
                Some(serde_json::json!({ "category": created })),
            )
        }
        CategoryCommands::Update { id, name, description, sort_order } => {
            let updated = hook.update(&id, CategoryForm { name, description, sort_order }).await?;
            output_success(
                &output_format,
                &format!("Updated category '{}'", updated.name),
                Some(serde_json::json!({ "category": updated })),
            )
        }
        CategoryCommands::Toggle { id } => {
            let (categories, _) = loaded(&hook).await?;
            let category = categories
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow!("Category '{}' not found", id))?;
            let updated = hook.toggle_active(&category).await?;
            output_success(
                &output_format,
                &format!(
                    "Category '{}' is now {}",
                    updated.name,
                    if updated.is_active { "active" } else { "inactive" }
                ),
                Some(serde_json::json!({ "category": updated })),
            )
        }
    }
}

fn print_categories(categories: &[Category]) {
    print_header(&format!("{:<38} {:<24} {:>5} {:<6}", "ID", "NAME", "ORDER", "ACTIVE"));
    for category in categories {
        println!(
            "{:<38} {:<24} {:>5} {:<6}",
            category.id,
            category.name,
            category.sort_order,
            flag(category.is_active)
        );
    }
}
