//! Fingerprint service - stable per-installation device identifier
//!
//! The raw platform identifier is digested with SHA-256 before it is
//! persisted, so it never reaches storage or the network.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::result::Result;
use crate::domain::DeviceFingerprint;
use crate::ports::{DeviceIdSource, SecureStore};

/// Store key for the device fingerprint
pub const DEVICE_ID_KEY: &str = "device_id";

/// Fingerprint service
pub struct FingerprintService {
    store: Arc<dyn SecureStore>,
    source: Arc<dyn DeviceIdSource>,
}

impl FingerprintService {
    pub fn new(store: Arc<dyn SecureStore>, source: Arc<dyn DeviceIdSource>) -> Self {
        Self { store, source }
    }

    /// Return the persisted fingerprint, creating it on first use
    pub async fn get_or_create(&self) -> Result<DeviceFingerprint> {
        if let Some(existing) = self.get().await? {
            return Ok(existing);
        }

        let raw = match self.source.platform_id() {
            Some(id) => id,
            None => {
                let mut random = [0u8; 16];
                OsRng.fill_bytes(&mut random);
                hex::encode(random)
            }
        };

        let fingerprint = DeviceFingerprint::new(hex::encode(Sha256::digest(raw.as_bytes())));
        self.store.set(DEVICE_ID_KEY, fingerprint.as_str()).await?;
        Ok(fingerprint)
    }

    /// Read the fingerprint without creating one
    pub async fn get(&self) -> Result<Option<DeviceFingerprint>> {
        Ok(self
            .store
            .get(DEVICE_ID_KEY)
            .await?
            .filter(|id| !id.is_empty())
            .map(DeviceFingerprint::new))
    }

    /// Strict equality between the stored fingerprint and `expected`
    ///
    /// `false` when no fingerprint has been created yet.
    pub async fn verify_binding(&self, expected: &str) -> Result<bool> {
        Ok(self
            .get()
            .await?
            .map(|fp| fp.matches(expected))
            .unwrap_or(false))
    }
}
