use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::AdminError;

/// Currency all prices are shown in
pub const CURRENCY: &str = "GHS";

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error in the appropriate format
pub fn output_error(output_format: &OutputFormat, error: &AdminError) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&error.to_json())?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", error);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Print `{name: value}` as pretty JSON
pub fn output_json(name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&json!({ name: value }))?);
    Ok(())
}

/// Print a table header followed by a rule of the same width
pub fn print_header(header: &str) {
    println!("{}", header);
    println!("{}", "-".repeat(header.chars().count()));
}

/// `GHS 12.50`
pub fn format_price(amount: Decimal) -> String {
    format!("{} {:.2}", CURRENCY, amount.round_dp(2))
}

/// `yes`/`no` column value
pub fn flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
