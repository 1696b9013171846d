//! Device fingerprint domain model

use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};

/// Hashed, installation-stable device identifier
///
/// Only the SHA-256 digest of the platform identifier is ever held here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self(device_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against a fingerprint from elsewhere, in constant time
    pub fn matches(&self, other: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), other.as_bytes())
    }
}

impl std::fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of comparing the local fingerprint with the registered one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBinding {
    Matched,
    /// Informational: the identity was registered from another device
    Mismatch,
}
