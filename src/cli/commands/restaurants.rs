use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::database::models::{Restaurant, RestaurantForm};

#[derive(Subcommand)]
pub enum RestaurantCommands {
    #[command(about = "List all restaurants")]
    List,

    #[command(about = "Onboard a restaurant on a trial subscription")]
    Create {
        #[arg(help = "Restaurant name")]
        name: String,
        #[arg(long, help = "Contact phone")]
        phone: String,
        #[arg(long, help = "Mobile money number customers pay to")]
        momo_number: String,
        #[arg(long, help = "Mobile money account name")]
        momo_name: String,
        #[arg(long, help = "Contact email")]
        email: Option<String>,
        #[arg(long, help = "Description")]
        description: Option<String>,
    },

    #[command(about = "Activate or deactivate a restaurant")]
    Toggle {
        #[arg(help = "Restaurant ID")]
        id: String,
    },
}

pub async fn handle(cmd: RestaurantCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    let hook = runtime.context.restaurants(true);
    match cmd {
        RestaurantCommands::List => {
            hook.require_platform("list restaurants")?;
            let (restaurants, _) = loaded(&hook).await?;
            if restaurants.is_empty() {
                return output_empty_collection(&output_format, "restaurants", "No restaurants yet");
            }
            match output_format {
                OutputFormat::Json => output_json("restaurants", &restaurants)?,
                OutputFormat::Text => print_restaurants(&restaurants),
            }
            Ok(())
        }
        RestaurantCommands::Create { name, phone, momo_number, momo_name, email, description } => {
            let form = RestaurantForm {
                name,
                description,
                phone,
                email,
                momo_number,
                momo_name,
            };
            let created = hook.create(form).await?;
            output_success(
                &output_format,
                &format!("Created restaurant '{}' ({})", created.name, created.id),
                Some(json!({ "restaurant": created })),
            )
        }
        RestaurantCommands::Toggle { id } => {
            let (restaurants, _) = loaded(&hook).await?;
            let restaurant = restaurants
                .into_iter()
                .find(|r| r.id.as_str() == id)
                .ok_or_else(|| anyhow!("Restaurant '{}' not found", id))?;
            let updated = hook.toggle_active(&restaurant).await?;
            output_success(
                &output_format,
                &format!(
                    "Restaurant '{}' is now {}",
                    updated.name,
                    if updated.is_active { "active" } else { "inactive" }
                ),
                Some(json!({ "restaurant": updated })),
            )
        }
    }
}

fn print_restaurants(restaurants: &[Restaurant]) {
    print_header(&format!(
        "{:<38} {:<24} {:<16} {:<6} {:<10} {}",
        "ID", "NAME", "PHONE", "ACTIVE", "PLAN", "TRIAL ENDS"
    ));
    for restaurant in restaurants {
        println!(
            "{:<38} {:<24} {:<16} {:<6} {:<10} {}",
            restaurant.id,
            restaurant.name,
            restaurant.phone,
            flag(restaurant.is_active),
            restaurant.subscription_status.as_str(),
            restaurant
                .trial_ends_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        );
    }
}
