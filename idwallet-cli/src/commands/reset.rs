//! Reset command - wipe every stored secret

use anyhow::Result;
use dialoguer::Confirm;

use super::get_context;
use crate::output;

pub async fn run(force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt("Delete the PIN, identity link and device id from this wallet?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let mut ctx = get_context("reset").await?;
    ctx.reset().await?;

    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        output::success("Wallet reset");
    }
    Ok(())
}
