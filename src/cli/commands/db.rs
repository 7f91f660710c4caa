use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::manager::CHANGE_CHANNEL;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Install the change-notification triggers used for realtime sync")]
    InitRealtime,

    #[command(about = "Check database connectivity")]
    Ping,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database).await?;
    match cmd {
        DbCommands::InitRealtime => {
            DatabaseManager::install_realtime(&pool).await?;
            output_success(
                &output_format,
                &format!("Realtime triggers installed on channel '{}'", CHANGE_CHANNEL),
                None,
            )
        }
        DbCommands::Ping => {
            DatabaseManager::health_check(&pool).await?;
            output_success(&output_format, "Database is reachable", None)
        }
    }
}
