//! Security event log in logs.duckdb
//!
//! Events are names plus the kind of action and the command that raised
//! them. PINs, hashes, salts, phone numbers, device identifiers and amounts
//! are never written; error text comes only from this crate's own messages.
//!
//! Both front-ends share the file, so each row carries its source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use duckdb::types::Value;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use super::migration::MigrationService;
use crate::log_migrations::LOG_MIGRATIONS;

/// Front-end that wrote an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Cli,
    App,
}

impl LogSource {
    fn as_str(&self) -> &'static str {
        match self {
            LogSource::Cli => "cli",
            LogSource::App => "app",
        }
    }
}

/// An event about to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    /// Kind of sensitive action, e.g. "transfer" or "account_pin"
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// CLI command that raised the event
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    /// Unix milliseconds
    pub recorded_at: i64,
    pub source: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub action: Option<String>,
    pub command: Option<String>,
    pub error: Option<String>,
}

impl LogEntry {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.recorded_at).single()
    }
}

/// Filter for reading the log, newest first
#[derive(Debug, Clone)]
pub struct LogQuery {
    limit: usize,
    event: Option<String>,
    errors_only: bool,
    since: Option<DateTime<Utc>>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            event: None,
            errors_only: false,
            since: None,
        }
    }
}

impl LogQuery {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn errors_only(mut self) -> Self {
        self.errors_only = true;
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(event) = &self.event {
            clauses.push("event = ?");
            params.push(Value::Text(event.clone()));
        }
        if self.errors_only {
            clauses.push("error IS NOT NULL");
        }
        if let Some(since) = self.since {
            clauses.push("recorded_at >= ?");
            params.push(Value::BigInt(since.timestamp_millis()));
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        params.push(Value::BigInt(self.limit as i64));

        (
            format!(
                "SELECT id, recorded_at, source, app_version, platform, event, action, command, error \
                 FROM security_events {} ORDER BY id DESC LIMIT ?",
                filter
            ),
            params,
        )
    }
}

/// Summary counts for the whole log
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub errors: u64,
    /// Count per event name
    pub by_event: BTreeMap<String, u64>,
}

impl LogStats {
    pub fn count(&self, event: &str) -> u64 {
        self.by_event.get(event).copied().unwrap_or(0)
    }
}

fn map_entry(row: &duckdb::Row<'_>) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        recorded_at: row.get(1)?,
        source: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        action: row.get(6)?,
        command: row.get(7)?,
        error: row.get(8)?,
    })
}

/// Writer and reader for logs.duckdb
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    source: LogSource,
    app_version: String,
}

impl LoggingService {
    /// Open or create logs.duckdb in `wallet_dir` and apply its migrations
    pub fn new(wallet_dir: &Path, source: LogSource, app_version: impl Into<String>) -> Result<Self> {
        let db_path = wallet_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            source,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Log connection poisoned: {}", e))
    }

    pub fn log(&self, event: LogEvent) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO security_events \
             (recorded_at, source, app_version, platform, event, action, command, error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                Utc::now().timestamp_millis(),
                self.source.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.action,
                &event.command,
                &event.error,
            ],
        )?;
        Ok(())
    }

    pub fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let (sql, params) = query.to_sql();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(duckdb::params_from_iter(params.iter()), map_entry)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.conn()?;
        let (total, errors): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(error) FROM security_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare("SELECT event, COUNT(*) FROM security_events GROUP BY event")?;
        let by_event = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<duckdb::Result<BTreeMap<_, _>>>()?;

        Ok(LogStats {
            total: total as u64,
            errors: errors as u64,
            by_event,
        })
    }

    /// Delete events older than `age`; returns how many were removed
    pub fn prune(&self, age: Duration) -> Result<u64> {
        let cutoff = (Utc::now() - age).timestamp_millis();
        let deleted = self
            .conn()?
            .execute("DELETE FROM security_events WHERE recorded_at < ?", [cutoff])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Record an event on an optional logger, ignoring failures
///
/// Logging never breaks an authentication flow.
pub fn record(logger: Option<&LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}
