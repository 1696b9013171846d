//! Secure store port - encrypted local key/value persistence

use async_trait::async_trait;

use crate::domain::result::Result;

/// Encrypted-at-rest key/value store private to this application
///
/// Implementations must report platform failures as
/// `Error::StorageUnavailable`. A missing key is `Ok(None)`, never an error,
/// and an error is never reported as a missing key.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value (no-op if absent)
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every value held by this application
    async fn delete_all(&self) -> Result<()>;
}
