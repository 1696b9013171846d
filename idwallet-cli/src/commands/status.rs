//! Status command - show PIN, identity and device state

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;
use idwallet_core::PinState;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context("status").await?;
    let status = ctx.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Wallet Security Status".bold());
    println!();

    let pin = match status.pin {
        PinState::NoPin => "not set".yellow().to_string(),
        PinState::Locked(length) => format!("{}-digit, locked", length.digits()),
        PinState::Verified(length) => format!("{}-digit, verified", length.digits()),
    };
    let dash = || "-".dimmed().to_string();

    let mut table = output::create_table();
    table.add_row(vec!["PIN".to_string(), pin]);
    table.add_row(vec![
        "Registered".to_string(),
        if status.registered { "yes".green().to_string() } else { "no".to_string() },
    ]);
    table.add_row(vec!["Phone".to_string(), status.phone.unwrap_or_else(dash)]);
    table.add_row(vec!["Identity".to_string(), status.identity_id.unwrap_or_else(dash)]);
    table.add_row(vec!["Device".to_string(), status.device_id.unwrap_or_else(dash)]);
    table.add_row(vec![
        "Demo mode".to_string(),
        if ctx.config.demo_mode { "on".green().to_string() } else { "off".to_string() },
    ]);

    println!("{}", table);

    if ctx.step_up.is_locked() {
        println!();
        output::error("PIN entry is locked after too many failed attempts.");
    }

    Ok(())
}
