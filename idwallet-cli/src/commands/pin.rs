//! PIN command - create, change and check the wallet PIN

use anyhow::Result;
use clap::{Subcommand, ValueEnum};

use super::{get_context, read_new_pin, read_pin, NEW_PIN_ENV, PIN_ENV};
use crate::output;
use idwallet_core::{Error, PinLength, StepUpFactor, StepUpOutcome};

#[derive(Clone, Copy, ValueEnum)]
pub enum LengthArg {
    #[value(name = "4")]
    Four,
    #[value(name = "6")]
    Six,
}

impl From<LengthArg> for PinLength {
    fn from(arg: LengthArg) -> Self {
        match arg {
            LengthArg::Four => PinLength::Four,
            LengthArg::Six => PinLength::Six,
        }
    }
}

#[derive(Subcommand)]
pub enum PinCommands {
    /// Create the first local PIN
    Set {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the PIN after confirming the current one
    Change {
        /// Switch to a PIN of this length
        #[arg(long, value_enum)]
        length: Option<LengthArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a PIN against the stored credential
    Verify {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether a PIN is configured
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: PinCommands) -> Result<()> {
    match command {
        PinCommands::Set { json } => {
            let mut ctx = get_context("pin set").await?;
            if ctx.pin_service.has_pin().await? && !json {
                output::info("A PIN is already configured. Use 'idw pin change' to replace it.");
                return Err(Error::AlreadyConfigured.into());
            }
            let pin = read_new_pin(NEW_PIN_ENV)?;
            let result = ctx.create_pin(&pin).await;
            if json {
                return output::json_result(result);
            }
            let length = result?;
            output::success(&format!("{}-digit PIN saved", length.digits()));
        }
        PinCommands::Change { length, json } => {
            let mut ctx = get_context("pin change").await?;
            let current = read_pin("Current PIN", PIN_ENV)?;
            let new_pin = read_new_pin(NEW_PIN_ENV)?;

            let result = match length {
                Some(length) => {
                    ctx.change_pin_length(&current, &new_pin, length.into())
                        .await
                }
                None => ctx.change_pin(&current, &new_pin).await,
            };
            if json {
                return output::json_result(result);
            }

            match result {
                Ok(saved) => {
                    output::success(&format!("PIN changed ({} digits)", saved.digits()))
                }
                Err(Error::Mismatch) => {
                    output::error(&format!(
                        "Incorrect PIN. {} attempt(s) remaining.",
                        ctx.step_up.attempts_remaining()
                    ));
                    anyhow::bail!("PIN not changed");
                }
                Err(Error::LockedOut) => {
                    output::outcome(&StepUpOutcome::LockedOut, false)?;
                    anyhow::bail!("PIN not changed");
                }
                Err(e) => return Err(e.into()),
            }
        }
        PinCommands::Verify { json } => {
            let mut ctx = get_context("pin verify").await?;
            let pin = read_pin("PIN", PIN_ENV)?;
            let outcome = ctx.unlock(StepUpFactor::Pin(&pin)).await?;
            if !output::outcome(&outcome, json)? {
                anyhow::bail!("PIN verification failed");
            }
        }
        PinCommands::Status { json } => {
            let ctx = get_context("pin status").await?;
            let state = ctx.pin_service.state(&ctx.session).await?;
            let remaining = ctx.step_up.attempts_remaining();

            if json {
                println!(
                    "{}",
                    serde_json::json!({ "pin": state, "attempts_remaining": remaining })
                );
            } else {
                match ctx.pin_service.pin_length().await? {
                    Some(length) => {
                        output::info(&format!("{}-digit PIN configured", length.digits()));
                        println!("  Attempts remaining: {}", remaining);
                    }
                    None => output::warning("No PIN configured"),
                }
            }
        }
    }
    Ok(())
}
