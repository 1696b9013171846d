//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_wallet_dir;
use idwallet_core::adapters::demo::{DEMO_OTP_CODE, DEMO_PAYMENT_PIN};
use idwallet_core::config::Config;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let wallet_dir = get_wallet_dir()?;
    std::fs::create_dir_all(&wallet_dir)?;
    let mut config = Config::load(&wallet_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&wallet_dir)?;
            println!("{}", "Demo mode enabled".green());
            println!("Demo mode uses a separate store and an offline identity service.");
            println!("  One-time code: {}", DEMO_OTP_CODE);
            println!("  Payment PIN for demo-checking and demo-savings: {}", DEMO_PAYMENT_PIN);
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&wallet_dir)?;
            println!("{}", "Demo mode disabled".yellow());
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }
    Ok(())
}
