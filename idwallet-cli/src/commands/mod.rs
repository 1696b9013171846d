//! CLI command implementations

pub mod demo;
pub mod device;
pub mod logs;
pub mod pay;
pub mod pin;
pub mod register;
pub mod reset;
pub mod status;
pub mod unlock;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Password;
use idwallet_core::services::{EncryptionService, LogEvent, LogSource, LoggingService};
use idwallet_core::WalletContext;
use zeroize::Zeroizing;

/// Pre-derived hex key for the secure store
const STORE_KEY_ENV: &str = "IDWALLET_STORE_KEY";

/// Passphrase the store key is derived from
const STORE_PASSWORD_ENV: &str = "IDWALLET_STORE_PASSWORD";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let wallet_dir = get_wallet_dir().ok()?;
    std::fs::create_dir_all(&wallet_dir).ok()?;
    LoggingService::new(&wallet_dir, LogSource::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the wallet directory from environment or default
pub fn get_wallet_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("IDWALLET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".idwallet"))
}

/// Open the wallet and rebuild its session
///
/// Key priority: IDWALLET_STORE_KEY (pre-derived) > IDWALLET_STORE_PASSWORD
/// (Argon2id derivation) > device key file.
pub async fn get_context(command: &str) -> Result<WalletContext> {
    let wallet_dir = get_wallet_dir()?;
    std::fs::create_dir_all(&wallet_dir)
        .with_context(|| format!("Failed to create wallet directory: {:?}", wallet_dir))?;

    let store_key = match std::env::var(STORE_KEY_ENV) {
        Ok(key) => Zeroizing::new(key),
        Err(_) => {
            let password = std::env::var(STORE_PASSWORD_ENV).ok();
            EncryptionService::new(wallet_dir.clone())
                .resolve_key(password.as_deref())
                .context("Failed to resolve secure store key")?
        }
    };

    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_started").with_command(command));

    let mut ctx = WalletContext::open(&wallet_dir, &store_key, logger)
        .context("Failed to open wallet")?;
    ctx.restore_session().await?;
    Ok(ctx)
}

/// Read a PIN without echo
///
/// `env_var` lets scripts supply the PIN non-interactively. The buffer is
/// wiped when the returned value drops.
pub fn read_pin(prompt: &str, env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pin) = std::env::var(env_var) {
        return Ok(Zeroizing::new(pin));
    }
    Ok(Zeroizing::new(Password::new().with_prompt(prompt).interact()?))
}

/// Read a new PIN, asking twice when interactive
pub fn read_new_pin(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pin) = std::env::var(env_var) {
        return Ok(Zeroizing::new(pin));
    }
    Ok(Zeroizing::new(
        Password::new()
            .with_prompt("New PIN")
            .with_confirmation("Confirm PIN", "PINs do not match")
            .interact()?,
    ))
}

/// Env var for the current wallet PIN
pub const PIN_ENV: &str = "IDWALLET_PIN";

/// Env var for a new wallet PIN
pub const NEW_PIN_ENV: &str = "IDWALLET_NEW_PIN";
