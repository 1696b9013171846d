//! DuckDB secure store implementation
//!
//! Values live in the `secure_kv` table of a DuckDB file that is always
//! opened with an encryption key (AES-256-GCM at rest).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error, Result as DomainResult};
use crate::ports::SecureStore;
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn storage_error(e: impl std::fmt::Display) -> Error {
    Error::storage(e.to_string())
}

/// Encrypted DuckDB key/value store
pub struct DuckDbSecureStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbSecureStore {
    /// Open (or create) the encrypted store
    ///
    /// `encryption_key` is the hex-encoded 256-bit key from
    /// `EncryptionService`. Retries with exponential backoff when another
    /// process holds the file.
    pub fn open(db_path: &Path, encryption_key: &str) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path, encryption_key) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[idwallet] Secure store busy, retrying in {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open secure store after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path, encryption_key: &str) -> Result<Connection> {
        if encryption_key.len() != 64 || hex::decode(encryption_key).is_err() {
            anyhow::bail!("Secure store key must be 32 bytes of hex");
        }

        // Extension autoloading stays off; cached extensions may fail code signing checks
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        conn.execute(
            &format!(
                "ATTACH '{}' AS vault (ENCRYPTION_KEY '{}')",
                db_path.display().to_string().replace('\'', "''"),
                encryption_key
            ),
            [],
        )?;
        conn.execute("USE vault", [])?;
        Ok(conn)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        MigrationService::new(&conn).run_pending()?;
        Ok(())
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(storage_error)
    }

    /// Number of stored keys
    pub fn len(&self) -> DomainResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM secure_kv", [], |row| row.get(0))
            .map_err(storage_error)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl SecureStore for DuckDbSecureStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM secure_kv WHERE key = ?",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(storage_error)
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO secure_kv (key, value, updated_at) VALUES (?, ?, current_timestamp)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM secure_kv WHERE key = ?", [key])
            .map_err(storage_error)?;
        Ok(())
    }

    async fn delete_all(&self) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM secure_kv", []).map_err(storage_error)?;
        Ok(())
    }
}
