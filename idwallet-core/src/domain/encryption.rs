//! Secure store encryption models

use serde::{Deserialize, Serialize};

/// Default Argon2id parameters
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 4;
pub const DEFAULT_HASH_LEN: u32 = 32;

/// Argon2id parameters for store key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
    pub hash_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

/// Where the store encryption key comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Derived from a user passphrase with Argon2id
    Passphrase,
    /// Random key held in a private file next to the store
    DeviceKey,
}

/// Store encryption metadata kept in encryption.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub key_source: KeySource,
    /// Base64-encoded random salt (passphrase keys only)
    #[serde(default)]
    pub salt: Option<String>,
    pub algorithm: String,
    pub version: u32,
    #[serde(default)]
    pub argon2_params: Option<Argon2Params>,
}

impl EncryptionMetadata {
    /// Metadata for a passphrase-derived key
    pub fn passphrase(salt: String, argon2_params: Argon2Params) -> Self {
        Self {
            key_source: KeySource::Passphrase,
            salt: Some(salt),
            algorithm: "argon2id".to_string(),
            version: 1,
            argon2_params: Some(argon2_params),
        }
    }

    /// Metadata for a random device key
    pub fn device_key() -> Self {
        Self {
            key_source: KeySource::DeviceKey,
            salt: None,
            algorithm: "random-256".to_string(),
            version: 1,
            argon2_params: None,
        }
    }
}

/// Status of store encryption for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub initialized: bool,
    pub key_source: Option<KeySource>,
    pub algorithm: Option<String>,
}

impl EncryptionStatus {
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            key_source: None,
            algorithm: None,
        }
    }

    pub fn from_metadata(meta: &EncryptionMetadata) -> Self {
        Self {
            initialized: true,
            key_source: Some(meta.key_source),
            algorithm: Some(meta.algorithm.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_metadata() {
        let meta = EncryptionMetadata::passphrase("base64salt==".to_string(), Argon2Params::default());
        assert_eq!(meta.key_source, KeySource::Passphrase);
        assert_eq!(meta.algorithm, "argon2id");
        assert_eq!(meta.argon2_params.unwrap().memory_cost, 65536);
    }

    #[test]
    fn test_device_key_metadata_roundtrips_without_salt() {
        let meta = EncryptionMetadata::device_key();
        let json = serde_json::to_string(&meta).unwrap();
        let back: EncryptionMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key_source, KeySource::DeviceKey);
        assert!(back.salt.is_none());
    }

    #[test]
    fn test_encryption_status() {
        let status = EncryptionStatus::uninitialized();
        assert!(!status.initialized);
        assert!(status.key_source.is_none());
    }
}
