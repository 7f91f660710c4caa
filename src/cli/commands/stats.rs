use anyhow::anyhow;
use clap::Subcommand;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};

#[derive(Subcommand)]
pub enum StatsCommands {
    #[command(about = "Platform totals (super admins)")]
    Platform,

    #[command(about = "Figures for the scoped restaurant")]
    Restaurant,
}

pub async fn handle(cmd: StatsCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        StatsCommands::Platform => {
            let hook = runtime.context.platform_stats(true);
            hook.require_platform("view platform statistics")?;
            let (stats, _) = loaded(&hook).await?;
            let stats = stats.ok_or_else(|| anyhow!("No platform statistics available"))?;
            match output_format {
                OutputFormat::Json => output_json("stats", &stats)?,
                OutputFormat::Text => {
                    println!("Restaurants: {} ({} active)", stats.total_restaurants, stats.active_restaurants);
                    println!("Users:       {}", stats.total_users);
                    println!("Orders:      {}", stats.total_orders);
                    println!("Revenue:     {}", format_price(stats.total_revenue));
                }
            }
            Ok(())
        }
        StatsCommands::Restaurant => {
            let hook = runtime.context.restaurant_stats();
            hook.require_restaurant("view restaurant statistics")?;
            let (stats, scope) = loaded(&hook).await?;
            let stats = stats.ok_or_else(|| anyhow!("No statistics for {}", scope))?;
            match output_format {
                OutputFormat::Json => output_json("stats", &stats)?,
                OutputFormat::Text => {
                    println!("Orders:          {} ({} pending)", stats.total_orders, stats.pending_orders);
                    println!("Revenue:         {}", format_price(stats.revenue));
                    println!("Avg order value: {}", format_price(stats.avg_order_value));
                    println!("Menu:            {} items in {} categories", stats.menu_items, stats.categories);
                    if !stats.recent_orders.is_empty() {
                        println!();
                        println!("Recent orders:");
                        for order in &stats.recent_orders {
                            let customer = order
                                .customer
                                .as_ref()
                                .map(|c| c.name.clone().unwrap_or_else(|| c.phone.clone()))
                                .unwrap_or_default();
                            println!(
                                "  {:<12} {:<20} {:<11} {:>12}",
                                order.order_number,
                                customer,
                                order.status,
                                format_price(order.total_amount)
                            );
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
