//! Encryption service - secure store key management
//!
//! The DuckDB secure store is always encrypted (AES-256-GCM). Its key is
//! either derived from a passphrase with Argon2id or a random device key kept
//! in a private file next to the store.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::domain::{Argon2Params, EncryptionMetadata, EncryptionStatus, KeySource};

/// Metadata file name
pub const ENCRYPTION_FILE: &str = "encryption.json";

/// Device key file name
pub const DEVICE_KEY_FILE: &str = "store.key";

const SALT_BYTES: usize = 16;
const KEY_BYTES: usize = 32;

/// Secure store key management
pub struct EncryptionService {
    wallet_dir: PathBuf,
    params: Argon2Params,
}

impl EncryptionService {
    pub fn new(wallet_dir: PathBuf) -> Self {
        Self {
            wallet_dir,
            params: Argon2Params::default(),
        }
    }

    /// Argon2id parameters used when a passphrase key is first created
    pub fn with_params(mut self, params: Argon2Params) -> Self {
        self.params = params;
        self
    }

    fn encryption_file(&self) -> PathBuf {
        self.wallet_dir.join(ENCRYPTION_FILE)
    }

    fn key_file(&self) -> PathBuf {
        self.wallet_dir.join(DEVICE_KEY_FILE)
    }

    fn load_metadata(&self) -> Result<Option<EncryptionMetadata>> {
        let path = self.encryption_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let metadata = serde_json::from_str(&content).context("Invalid encryption.json")?;
        Ok(Some(metadata))
    }

    fn save_metadata(&self, metadata: &EncryptionMetadata) -> Result<()> {
        let content = serde_json::to_string_pretty(metadata)?;
        fs::write(self.encryption_file(), content)?;
        Ok(())
    }

    /// Derive encryption key from passphrase using Argon2id
    fn derive_key(
        &self,
        passphrase: &str,
        salt: &[u8],
        params: &Argon2Params,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let argon2_params = argon2::Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(params.hash_len as usize),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create argon2 params: {:?}", e))?;

        let argon2 = argon2::Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2_params,
        );

        let mut key = Zeroizing::new(vec![0u8; params.hash_len as usize]);
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow::anyhow!("Failed to derive key: {:?}", e))?;

        Ok(key)
    }

    /// Get key management status
    pub fn get_status(&self) -> Result<EncryptionStatus> {
        Ok(match self.load_metadata()? {
            Some(metadata) => EncryptionStatus::from_metadata(&metadata),
            None => EncryptionStatus::uninitialized(),
        })
    }

    /// Hex store key for this wallet, creating key material on first use
    ///
    /// A passphrase wallet always needs its passphrase; a device-key wallet
    /// rejects one. The returned key is wiped when dropped.
    pub fn resolve_key(&self, passphrase: Option<&str>) -> Result<Zeroizing<String>> {
        match self.load_metadata()? {
            Some(metadata) => self.existing_key(&metadata, passphrase),
            None => match passphrase {
                Some(passphrase) => self.create_passphrase_key(passphrase),
                None => self.create_device_key(),
            },
        }
    }

    fn existing_key(
        &self,
        metadata: &EncryptionMetadata,
        passphrase: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        match metadata.key_source {
            KeySource::Passphrase => {
                let passphrase = passphrase.context(
                    "Secure store is passphrase protected. Set IDWALLET_STORE_PASSWORD.",
                )?;
                let salt = metadata
                    .salt
                    .as_deref()
                    .context("Missing salt in encryption metadata")?;
                let salt = base64::engine::general_purpose::STANDARD
                    .decode(salt)
                    .context("Invalid salt in encryption metadata")?;
                let params = metadata.argon2_params.clone().unwrap_or_default();
                Ok(Zeroizing::new(hex::encode(
                    self.derive_key(passphrase, &salt, &params)?.as_slice(),
                )))
            }
            KeySource::DeviceKey => {
                if passphrase.is_some() {
                    anyhow::bail!("Secure store uses a device key; unset IDWALLET_STORE_PASSWORD");
                }
                let raw = Zeroizing::new(
                    fs::read_to_string(self.key_file())
                        .context("Device key file is missing; the secure store cannot be opened")?,
                );
                let key = Zeroizing::new(raw.trim().to_string());
                if key.len() != KEY_BYTES * 2 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                    anyhow::bail!("Device key file is corrupt");
                }
                Ok(key)
            }
        }
    }

    fn create_passphrase_key(&self, passphrase: &str) -> Result<Zeroizing<String>> {
        if passphrase.is_empty() {
            anyhow::bail!("Store passphrase cannot be empty");
        }

        let mut salt = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt);
        let key = self.derive_key(passphrase, &salt, &self.params)?;

        fs::create_dir_all(&self.wallet_dir)?;
        let salt_b64 = base64::engine::general_purpose::STANDARD.encode(salt);
        self.save_metadata(&EncryptionMetadata::passphrase(salt_b64, self.params.clone()))?;
        Ok(Zeroizing::new(hex::encode(key.as_slice())))
    }

    fn create_device_key(&self) -> Result<Zeroizing<String>> {
        let mut key = Zeroizing::new([0u8; KEY_BYTES]);
        OsRng.fill_bytes(key.as_mut_slice());
        let key_hex = Zeroizing::new(hex::encode(key.as_slice()));

        fs::create_dir_all(&self.wallet_dir)?;
        write_private(&self.key_file(), &key_hex).context("Failed to write device key")?;
        self.save_metadata(&EncryptionMetadata::device_key())?;
        Ok(key_hex)
    }

    /// Remove key material. The store becomes unreadable afterwards.
    pub fn reset(&self) -> Result<()> {
        for path in [self.key_file(), self.encryption_file()] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        }
    }

    #[test]
    fn test_device_key_is_created_once() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf());
        assert!(!service.get_status().unwrap().initialized);

        let first = service.resolve_key(None).unwrap();
        let second = service.resolve_key(None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let status = service.get_status().unwrap();
        assert!(status.initialized);
        assert_eq!(status.key_source, Some(KeySource::DeviceKey));
    }

    #[cfg(unix)]
    #[test]
    fn test_device_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        EncryptionService::new(dir.path().to_path_buf())
            .resolve_key(None)
            .unwrap();
        let mode = fs::metadata(dir.path().join(DEVICE_KEY_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_passphrase_key_is_deterministic() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf()).with_params(fast_params());

        let key = service.resolve_key(Some("correct horse")).unwrap();
        assert_eq!(service.resolve_key(Some("correct horse")).unwrap(), key);
        assert_ne!(service.resolve_key(Some("wrong horse")).unwrap(), key);
        assert!(!dir.path().join(DEVICE_KEY_FILE).exists());
    }

    #[test]
    fn test_resolved_key_can_be_wiped() {
        use zeroize::Zeroize;

        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf()).with_params(fast_params());
        let mut key = service.resolve_key(Some("correct horse")).unwrap();
        let expected = key.to_string();

        key.zeroize();
        assert!(key.is_empty());
        assert_eq!(*service.resolve_key(Some("correct horse")).unwrap(), expected);
    }

    #[test]
    fn test_corrupt_device_key_is_rejected() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf());
        service.resolve_key(None).unwrap();

        fs::write(dir.path().join(DEVICE_KEY_FILE), "zz".repeat(KEY_BYTES)).unwrap();
        assert!(service.resolve_key(None).is_err());
    }

    #[test]
    fn test_passphrase_required_once_configured() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf()).with_params(fast_params());
        service.resolve_key(Some("correct horse")).unwrap();
        assert!(service.resolve_key(None).is_err());
    }

    #[test]
    fn test_device_key_rejects_passphrase() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf());
        service.resolve_key(None).unwrap();
        assert!(service.resolve_key(Some("pw")).is_err());
    }

    #[test]
    fn test_reset_removes_key_material() {
        let dir = tempdir().unwrap();
        let service = EncryptionService::new(dir.path().to_path_buf());
        let first = service.resolve_key(None).unwrap();

        service.reset().unwrap();
        assert!(!service.get_status().unwrap().initialized);
        assert_ne!(service.resolve_key(None).unwrap(), first);
    }
}
