use clap::ValueEnum;
use serde::Serialize;
use tokio::sync::watch;

use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::sync::HookState;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchTarget {
    Orders,
    Categories,
    Menu,
}

pub async fn handle(target: WatchTarget, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    match target {
        WatchTarget::Orders => {
            let hook = runtime.context.orders();
            hook.require_restaurant("watch orders")?;
            follow(hook.subscribe(), output_format, |orders| {
                for order in orders {
                    println!(
                        "  {:<12} {:<11} {:<21} {:>12}",
                        order.order_number,
                        order.status,
                        order.payment_status,
                        format_price(order.total_amount)
                    );
                }
            })
            .await
        }
        WatchTarget::Categories => {
            let hook = runtime.context.categories();
            hook.require_restaurant("watch categories")?;
            follow(hook.subscribe(), output_format, |categories| {
                for category in categories {
                    println!("  {:<24} {}", category.name, flag(category.is_active));
                }
            })
            .await
        }
        WatchTarget::Menu => {
            let hook = runtime.context.menu_items();
            hook.require_restaurant("watch the menu")?;
            follow(hook.subscribe(), output_format, |catalog| {
                for item in &catalog.items {
                    println!("  {:<28} {:>12} {}", item.name, format_price(item.price), flag(item.is_available));
                }
            })
            .await
        }
    }
}

/// Print every settled state until interrupted
async fn follow<T: Serialize>(
    mut rx: watch::Receiver<HookState<T>>,
    output_format: OutputFormat,
    print: impl Fn(&T),
) -> anyhow::Result<()> {
    loop {
        {
            let state = rx.borrow_and_update();
            if !state.loading {
                match output_format {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::to_string(&serde_json::json!({
                            "scope": state.scope.key(),
                            "error": state.error,
                            "data": state.data,
                        }))?
                    ),
                    OutputFormat::Text => {
                        println!("[{}] {}", chrono::Utc::now().format("%H:%M:%S"), state.scope);
                        match &state.error {
                            Some(error) => println!("  read failed: {}", error),
                            None => print(&state.data),
                        }
                    }
                }
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
