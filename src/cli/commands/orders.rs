use anyhow::anyhow;
use clap::{Subcommand, ValueEnum};
use serde_json::json;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::database::models::{Order, OrderFilter, OrderStatus, PaymentReview};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReviewDecision {
    Verify,
    Reject,
}

impl From<ReviewDecision> for PaymentReview {
    fn from(value: ReviewDecision) -> Self {
        match value {
            ReviewDecision::Verify => PaymentReview::Verify,
            ReviewDecision::Reject => PaymentReview::Reject,
        }
    }
}

#[derive(Subcommand)]
pub enum OrderCommands {
    #[command(about = "List orders, newest first")]
    List {
        #[arg(long, default_value = "all", help = "View: all, pending-payment or active")]
        filter: String,
    },

    #[command(about = "Move an order to its next status")]
    Advance {
        #[arg(help = "Order ID")]
        id: String,
        #[arg(help = "Target status, e.g. CONFIRMED")]
        status: String,
    },

    #[command(about = "Verify or reject a payment awaiting review")]
    Review {
        #[arg(help = "Order ID")]
        id: String,
        #[arg(value_enum, help = "Decision")]
        decision: ReviewDecision,
    },
}

pub async fn handle(cmd: OrderCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    let hook = runtime.context.orders();
    match cmd {
        OrderCommands::List { filter } => {
            let filter = OrderFilter::parse(&filter).ok_or_else(|| anyhow!("Unknown order filter '{}'", filter))?;
            let (orders, scope) = loaded(&hook).await?;
            let orders: Vec<&Order> = filter.apply(&orders);
            if orders.is_empty() {
                return output_empty_collection(&output_format, "orders", &format!("No orders for {}", scope));
            }
            match output_format {
                OutputFormat::Json => output_json("orders", &orders)?,
                OutputFormat::Text => print_orders(&orders),
            }
            Ok(())
        }
        OrderCommands::Advance { id, status } => {
            let target = OrderStatus::parse(&status).ok_or_else(|| anyhow!("Unknown order status '{}'", status))?;
            let order = find_order(&hook, &id).await?;
            hook.advance(&order, target).await?;
            output_success(
                &output_format,
                &format!("Order {} moved to {}", order.order_number, target),
                Some(json!({ "order_id": order.id, "status": target })),
            )
        }
        OrderCommands::Review { id, decision } => {
            let order = find_order(&hook, &id).await?;
            hook.review_payment(&order, decision.into()).await?;
            output_success(
                &output_format,
                &format!(
                    "Payment for order {} {}",
                    order.order_number,
                    match decision {
                        ReviewDecision::Verify => "verified",
                        ReviewDecision::Reject => "rejected",
                    }
                ),
                Some(json!({ "order_id": order.id })),
            )
        }
    }
}

async fn find_order(hook: &crate::sync::OrdersHook, id: &str) -> anyhow::Result<Order> {
    let (orders, _) = loaded(hook).await?;
    orders
        .into_iter()
        .find(|o| o.id == id || o.order_number == id)
        .ok_or_else(|| anyhow!("Order '{}' not found", id))
}

fn print_orders(orders: &[&Order]) {
    print_header(&format!(
        "{:<12} {:<20} {:<11} {:<21} {:>12} {}",
        "NUMBER", "CUSTOMER", "STATUS", "PAYMENT", "TOTAL", "PLACED"
    ));
    for order in orders {
        let customer = order
            .customer
            .as_ref()
            .map(|c| c.name.clone().unwrap_or_else(|| c.phone.clone()))
            .unwrap_or_default();
        println!(
            "{:<12} {:<20} {:<11} {:<21} {:>12} {}",
            order.order_number,
            customer,
            order.status,
            order.payment_status,
            format_price(order.total_amount),
            order.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
