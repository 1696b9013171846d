//! Unlock command - PIN or biometric unlock, OTP recovery from a lockout

use anyhow::Result;
use dialoguer::Input;

use super::{get_context, read_pin, PIN_ENV};
use crate::output;
use idwallet_core::StepUpFactor;

/// Env var for a non-interactive OTP code
const OTP_ENV: &str = "IDWALLET_OTP";

pub async fn run(biometric: bool, recover: bool, phone: Option<String>, json: bool) -> Result<()> {
    let mut ctx = get_context("unlock").await?;

    if recover {
        let phone = match phone {
            Some(phone) => phone,
            None => Input::new().with_prompt("Phone number").interact_text()?,
        };
        let handle = ctx.begin_recovery(&phone).await?;
        if !json {
            output::info("A one-time code was sent to your phone");
        }
        let code = match std::env::var(OTP_ENV) {
            Ok(code) => code,
            Err(_) => Input::<String>::new().with_prompt("Code").interact_text()?,
        };

        let recovered = ctx.complete_recovery(&handle, code.trim()).await?;
        if json {
            println!("{}", serde_json::json!({ "recovered": recovered }));
        } else if recovered {
            output::success("Identity confirmed. PIN entry is unlocked.");
        }
        if !recovered {
            anyhow::bail!("Code was not accepted");
        }
        return Ok(());
    }

    let outcome = if biometric {
        ctx.unlock(StepUpFactor::Biometric).await?
    } else {
        let pin = read_pin("PIN", PIN_ENV)?;
        ctx.unlock(StepUpFactor::Pin(&pin)).await?
    };

    if !output::outcome(&outcome, json)? {
        anyhow::bail!("Wallet is still locked");
    }
    Ok(())
}
