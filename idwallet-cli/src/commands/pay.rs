//! Pay command - step-up verification for a transfer

use anyhow::Result;
use rust_decimal::Decimal;

use super::{get_context, read_pin, PIN_ENV};
use crate::output;
use idwallet_core::{SensitiveAction, StepUpFactor};

/// Env var for a non-interactive account payment PIN
const PAYMENT_PIN_ENV: &str = "IDWALLET_PAYMENT_PIN";

pub async fn run(account: &str, amount: Decimal, biometric: bool, json: bool) -> Result<()> {
    if amount <= Decimal::ZERO {
        anyhow::bail!("Amount must be positive");
    }

    let mut ctx = get_context("pay").await?;
    let action = SensitiveAction::Transfer {
        account_id: account.to_string(),
        amount,
    };

    let wallet = if biometric {
        ctx.authorize(&action, StepUpFactor::Biometric).await?
    } else {
        let pin = read_pin(&format!("Wallet PIN to send {}", amount), PIN_ENV)?;
        ctx.authorize(&action, StepUpFactor::Pin(&pin)).await?
    };
    if !wallet.is_approved() {
        output::outcome(&wallet, json)?;
        anyhow::bail!("Transfer not authorized");
    }

    let payment_pin = read_pin(&format!("Payment PIN for {}", account), PAYMENT_PIN_ENV)?;
    let bank = ctx.authorize_account(account, &payment_pin).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "account_id": account,
                "amount": amount,
                "wallet": wallet,
                "account": bank,
            })
        );
    } else if bank.is_approved() {
        output::success(&format!("Transfer of {} from {} authorized", amount, account));
    } else {
        output::outcome(&bank, false)?;
    }

    if !bank.is_approved() {
        anyhow::bail!("Transfer not authorized");
    }
    Ok(())
}
