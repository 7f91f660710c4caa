pub mod commands;
pub mod runtime;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub use runtime::Runtime;

#[derive(Parser)]
#[command(name = "restaurant-admin")]
#[command(about = "Restaurant admin CLI - scoped access to the ordering dashboard data")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Restaurant to view (super admins only)")]
    pub restaurant: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Inspect the signed-in session")]
    Session {
        #[command(subcommand)]
        cmd: commands::session::SessionCommands,
    },

    #[command(about = "Platform restaurant management (super admins)")]
    Restaurants {
        #[command(subcommand)]
        cmd: commands::restaurants::RestaurantCommands,
    },

    #[command(about = "Menu categories of the scoped restaurant")]
    Categories {
        #[command(subcommand)]
        cmd: commands::categories::CategoryCommands,
    },

    #[command(about = "Menu items of the scoped restaurant")]
    Menu {
        #[command(subcommand)]
        cmd: commands::menu::MenuCommands,
    },

    #[command(about = "Orders of the scoped restaurant")]
    Orders {
        #[command(subcommand)]
        cmd: commands::orders::OrderCommands,
    },

    #[command(about = "Platform user management (super admins)")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Dashboard figures")]
    Stats {
        #[command(subcommand)]
        cmd: commands::stats::StatsCommands,
    },

    #[command(about = "Follow a list and print it on every change")]
    Watch {
        #[arg(value_enum, help = "List to follow")]
        target: commands::watch::WatchTarget,
    },

    #[command(about = "Database maintenance")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let restaurant = cli.restaurant;

    let command = match cli.command {
        // Schema setup needs no session
        Commands::Db { cmd } => return commands::db::handle(cmd, output_format).await,
        command => command,
    };

    let runtime = Runtime::connect(restaurant.as_deref()).await?;
    match command {
        Commands::Session { cmd } => commands::session::handle(cmd, &runtime, output_format).await,
        Commands::Restaurants { cmd } => commands::restaurants::handle(cmd, &runtime, output_format).await,
        Commands::Categories { cmd } => commands::categories::handle(cmd, &runtime, output_format).await,
        Commands::Menu { cmd } => commands::menu::handle(cmd, &runtime, output_format).await,
        Commands::Orders { cmd } => commands::orders::handle(cmd, &runtime, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &runtime, output_format).await,
        Commands::Stats { cmd } => commands::stats::handle(cmd, &runtime, output_format).await,
        Commands::Watch { target } => commands::watch::handle(target, &runtime, output_format).await,
        Commands::Db { cmd } => commands::db::handle(cmd, output_format).await,
    }
}
