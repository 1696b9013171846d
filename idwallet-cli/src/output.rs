//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use idwallet_core::{OperationResult, StepUpOutcome};
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Print a step-up outcome; `true` when approved
pub fn outcome(outcome: &StepUpOutcome, json: bool) -> anyhow::Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(outcome.is_approved());
    }

    match outcome {
        StepUpOutcome::Approved => success("Approved"),
        StepUpOutcome::Denied { attempts_remaining } => error(&format!(
            "Incorrect PIN. {} attempt(s) remaining.",
            attempts_remaining
        )),
        StepUpOutcome::LockedOut => {
            error("Too many failed attempts. PIN entry is locked.");
            info("Recover with: idw unlock --recover --phone <number>");
        }
        StepUpOutcome::NotConfigured => warning("No PIN is configured. Run 'idw pin set' first."),
        StepUpOutcome::BiometricUnavailable => {
            warning("Biometric verification is not available on this device")
        }
    }
    Ok(outcome.is_approved())
}

/// Print a core result as an `OperationResult` envelope
///
/// Failures still exit non-zero after the envelope is printed.
pub fn json_result<T: Serialize>(
    result: idwallet_core::domain::result::Result<T>,
) -> anyhow::Result<()> {
    let failed = result.is_err();
    let envelope = OperationResult::from(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if failed {
        anyhow::bail!(envelope.error.unwrap_or_default());
    }
    Ok(())
}
