//! Device command - show and check the device fingerprint

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Show this device's fingerprint, creating it on first use
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a registered device id against this device
    Verify {
        /// Device id recorded at registration
        device_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: DeviceCommands) -> Result<()> {
    let ctx = get_context("device").await?;

    match command {
        DeviceCommands::Show { json } => {
            let fingerprint = ctx.fingerprint.get_or_create().await?;
            if json {
                println!("{}", serde_json::json!({ "device_id": fingerprint }));
            } else {
                println!("{}", fingerprint);
            }
        }
        DeviceCommands::Verify { device_id, json } => {
            let matched = ctx.fingerprint.verify_binding(&device_id).await?;
            if json {
                println!("{}", serde_json::json!({ "matched": matched }));
            } else if matched {
                output::success("Device matches");
            } else {
                output::warning("Device does not match");
            }
        }
    }
    Ok(())
}
