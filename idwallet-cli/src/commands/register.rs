//! Register and restore commands - tie the wallet to a remote identity

use anyhow::Result;

use super::{get_context, read_new_pin, read_pin, NEW_PIN_ENV, PIN_ENV};
use crate::output;
use idwallet_core::DeviceBinding;

pub async fn run_register(phone: &str, json: bool) -> Result<()> {
    let mut ctx = get_context("register").await?;
    let pin = read_new_pin(NEW_PIN_ENV)?;
    let result = ctx.register(phone, &pin).await;
    if json {
        return output::json_result(result);
    }

    let registration = result?;
    output::success("Identity registered");
    println!("  Identity: {}", registration.identity_id);
    println!("  PIN length: {} digits", registration.pin_length.digits());
    Ok(())
}

pub async fn run_restore(phone: &str, json: bool) -> Result<()> {
    let mut ctx = get_context("restore").await?;
    let pin = read_pin("PIN", PIN_ENV)?;
    let result = ctx.restore(phone, &pin).await;
    if json {
        return output::json_result(result);
    }

    let restored = result?;
    output::success("Identity restored on this device");
    println!("  Identity: {}", restored.identity_id);
    println!("  PIN length: {} digits", restored.pin_length.digits());
    if restored.device_binding == DeviceBinding::Mismatch {
        output::warning("This identity was registered from a different device.");
    }
    Ok(())
}
