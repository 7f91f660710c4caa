use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use super::loaded;
use crate::cli::utils::*;
use crate::cli::{OutputFormat, Runtime};
use crate::database::models::{NewUser, Role};
use crate::sync::UserDirectory;
use crate::types::RestaurantId;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List platform users")]
    List,

    #[command(about = "Provision a user through the backend")]
    Create {
        #[arg(help = "Full name")]
        name: String,
        #[arg(long, help = "Role: SUPER_ADMIN or RESTAURANT_ADMIN")]
        role: String,
        #[arg(long, help = "Initial password")]
        password: String,
        #[arg(long, help = "Email")]
        email: Option<String>,
        #[arg(long, help = "Phone")]
        phone: Option<String>,
        #[arg(long = "for", help = "Restaurant ID for restaurant admins")]
        restaurant_id: Option<String>,
    },

    #[command(about = "Change a user's role")]
    Role {
        #[arg(help = "User ID")]
        id: String,
        #[arg(help = "Role: SUPER_ADMIN or RESTAURANT_ADMIN")]
        role: String,
        #[arg(long = "for", help = "Restaurant ID for restaurant admins")]
        restaurant_id: Option<String>,
    },
}

fn parse_role(value: &str) -> anyhow::Result<Role> {
    Role::parse(value).ok_or_else(|| anyhow!("Unknown role '{}'", value))
}

pub async fn handle(cmd: UserCommands, runtime: &Runtime, output_format: OutputFormat) -> anyhow::Result<()> {
    let hook = runtime.context.users(true);
    match cmd {
        UserCommands::List => {
            hook.require_platform("list users")?;
            let (directory, _) = loaded(&hook).await?;
            if directory.users.is_empty() {
                return output_empty_collection(&output_format, "users", "No users yet");
            }
            match output_format {
                OutputFormat::Json => output_json("users", &directory.users)?,
                OutputFormat::Text => print_users(&directory),
            }
            Ok(())
        }
        UserCommands::Create { name, role, password, email, phone, restaurant_id } => {
            let user = NewUser {
                name,
                email,
                phone,
                password,
                role: parse_role(&role)?,
                restaurant_id: RestaurantId::from_selection(restaurant_id.as_deref()),
            };
            let created = hook.create_user(user).await?;
            output_success(&output_format, "User created", Some(json!({ "user": created })))
        }
        UserCommands::Role { id, role, restaurant_id } => {
            let role = parse_role(&role)?;
            hook.update_role(&id, role, RestaurantId::from_selection(restaurant_id.as_deref()))
                .await?;
            output_success(
                &output_format,
                &format!("User {} is now {}", id, role),
                Some(json!({ "user_id": id, "role": role })),
            )
        }
    }
}

fn print_users(directory: &UserDirectory) {
    print_header(&format!("{:<38} {:<24} {:<28} {:<17} {}", "ID", "NAME", "CONTACT", "ROLE", "RESTAURANT"));
    for user in &directory.users {
        let contact = user.email.as_deref().or(user.phone.as_deref()).unwrap_or("");
        let restaurant = user.restaurant.as_ref().map(|r| r.name.as_str()).unwrap_or("-");
        println!("{:<38} {:<24} {:<28} {:<17} {}", user.id, user.name, contact, user.role, restaurant);
    }
}
