//! idwallet CLI - PIN and device binding from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{demo, device, logs, pay, pin, register, reset, status, unlock};

/// idw - wallet PIN, identity and device binding
#[derive(Parser)]
#[command(name = "idw", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show PIN, identity and device status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a new identity for this wallet
    Register {
        /// Phone number for the identity
        #[arg(long)]
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore an existing identity onto this device
    Restore {
        /// Phone number the identity was registered with
        #[arg(long)]
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the wallet PIN
    Pin {
        #[command(subcommand)]
        command: pin::PinCommands,
    },

    /// Unlock the wallet
    Unlock {
        /// Use biometrics instead of the PIN
        #[arg(long, conflicts_with = "recover")]
        biometric: bool,
        /// Recover from a lockout with a one-time code
        #[arg(long)]
        recover: bool,
        /// Phone number for recovery
        #[arg(long, requires = "recover")]
        phone: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Authorize a transfer from a bank account
    Pay {
        /// Account to pay from
        #[arg(long)]
        account: String,
        /// Amount to transfer
        #[arg(long)]
        amount: Decimal,
        /// Use biometrics for the wallet step-up
        #[arg(long)]
        biometric: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or check the device fingerprint
    Device {
        #[command(subcommand)]
        command: device::DeviceCommands,
    },

    /// Wipe every stored secret
    Reset {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json).await,
        Commands::Register { phone, json } => register::run_register(&phone, json).await,
        Commands::Restore { phone, json } => register::run_restore(&phone, json).await,
        Commands::Pin { command } => pin::run(command).await,
        Commands::Unlock {
            biometric,
            recover,
            phone,
            json,
        } => unlock::run(biometric, recover, phone, json).await,
        Commands::Pay {
            account,
            amount,
            biometric,
            json,
        } => pay::run(&account, amount, biometric, json).await,
        Commands::Device { command } => device::run(command).await,
        Commands::Reset { force, json } => reset::run(force, json).await,
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
