use clap::Subcommand;
use serde_json::json;

use crate::auth::{AuthProvider, SessionState};
use crate::cli::{OutputFormat, Runtime};

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Show the resolved principal, role and restaurant")]
    Whoami,
}

pub async fn handle(cmd: SessionCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SessionCommands::Whoami => {
            let state = runtime.context.session.current();
            let expires_at = runtime.auth.session().map(|s| s.expires_at);
            let selected = runtime.context.selector.current();

            match output_format {
                OutputFormat::Json => {
                    let principal = state.principal();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "id": principal.map(|p| p.id.clone()),
                            "role": principal.map(|p| p.role),
                            "restaurant_id": principal.and_then(|p| p.restaurant_id.clone()),
                            "selected_restaurant": selected,
                            "expires_at": expires_at,
                        }))?
                    );
                }
                OutputFormat::Text => match &state {
                    SessionState::Resolved(principal) => {
                        println!("Principal:  {}", principal.id);
                        println!("Role:       {}", principal.role);
                        if let Some(restaurant_id) = &principal.restaurant_id {
                            println!("Restaurant: {}", restaurant_id);
                        }
                        if let Some(selected) = &selected {
                            println!("Viewing:    {}", selected);
                        }
                        if let Some(expires_at) = expires_at {
                            println!("Expires:    {}", expires_at.format("%Y-%m-%d %H:%M"));
                        }
                    }
                    other => println!("Session: {:?}", other),
                },
            }
            Ok(())
        }
    }
}
