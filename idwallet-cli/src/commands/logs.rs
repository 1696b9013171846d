//! Logs command - inspect the security event log

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_wallet_dir;
use crate::output;
use idwallet_core::services::{LogEntry, LogQuery, LogSource, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// Maximum number of events
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only events that carry an error
        #[arg(long)]
        errors: bool,
        /// Only this event name (e.g. lockout, step_up_denied)
        #[arg(long)]
        event: Option<String>,
        /// Only events from the last N hours
        #[arg(long)]
        since_hours: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count events by name
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Prune {
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let wallet_dir = get_wallet_dir()?;
    std::fs::create_dir_all(&wallet_dir)?;
    LoggingService::new(&wallet_dir, LogSource::Cli, env!("CARGO_PKG_VERSION"))
}

fn row(entry: LogEntry) -> Vec<String> {
    let time = entry
        .recorded_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.recorded_at.to_string());
    let context = entry.action.or(entry.command).unwrap_or_default();
    let event = if entry.event == "lockout" {
        entry.event.red().bold().to_string()
    } else {
        entry.event
    };
    let error = entry.error.map(|e| e.red().to_string()).unwrap_or_default();
    vec![time, entry.source, event, context, error]
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            since_hours,
            json,
        } => {
            let mut query = LogQuery::latest(limit);
            if errors {
                query = query.errors_only();
            }
            if let Some(event) = event {
                query = query.event(event);
            }
            if let Some(hours) = since_hours {
                query = query.since(Utc::now() - Duration::hours(hours));
            }
            let entries = log.query(&query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No matching events.");
            } else {
                let mut table = output::create_table();
                table.set_header(vec!["Time (UTC)", "Source", "Event", "Context", "Error"]);
                for entry in entries {
                    table.add_row(row(entry));
                }
                println!("{}", table);
            }
        }
        LogsCommands::Stats { json } => {
            let stats = log.stats()?;
            let size = std::fs::metadata(log.db_path()).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "stats": stats,
                        "database_path": log.db_path(),
                        "database_size_bytes": size,
                    })
                );
                return Ok(());
            }

            println!(
                "{} events, {} with errors ({}, {})",
                stats.total,
                stats.errors,
                log.db_path().display(),
                output::format_size(size)
            );
            if stats.count("lockout") > 0 {
                output::warning(&format!("{} lockout(s) recorded", stats.count("lockout")));
            }
            if !stats.by_event.is_empty() {
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count"]);
                let mut counts: Vec<_> = stats.by_event.iter().collect();
                counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
                for (event, count) in counts {
                    table.add_row(vec![event.clone(), count.to_string()]);
                }
                println!("{}", table);
            }
        }
        LogsCommands::Prune {
            older_than_days,
            force,
            json,
        } => {
            if older_than_days < 0 {
                anyhow::bail!("--older-than-days cannot be negative");
            }
            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Delete events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = log.prune(Duration::days(older_than_days))?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} event(s)", deleted));
            }
        }
    }

    Ok(())
}
