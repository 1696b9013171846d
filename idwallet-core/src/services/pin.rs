//! PIN service - creation, verification and replacement of the app PIN
//!
//! The credential is persisted as a single JSON record holding hash, salt and
//! length. Wrong PINs are reported through `PinCheck`, never as errors.
//!
//! Every comparison against a stored hash is crate-private: callers outside
//! the crate go through `WalletContext`, which counts failures.

use std::sync::Arc;

use serde::Serialize;

use super::fingerprint::FingerprintService;
use super::hashing;
use super::logging::{record, LogEvent, LoggingService};
use crate::domain::pin_policy;
use crate::domain::result::{Error, Result};
use crate::domain::{
    normalize_phone, DeviceBinding, IdentityId, IdentityLink, NewIdentity, PinCredential,
    PinLength, SessionContext,
};
use crate::ports::{RemoteIdentityStore, SecureStore};

/// Store key for the hashed PIN credential
pub const PIN_CREDENTIAL_KEY: &str = "pin_credential";

/// Store key for the cached remote identity link
pub const IDENTITY_LINK_KEY: &str = "identity_link";

/// Outcome of checking a PIN against the stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinCheck {
    Match,
    Mismatch,
    NotConfigured,
}

/// Lifecycle state of the app PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "length")]
pub enum PinState {
    NoPin,
    Locked(PinLength),
    Verified(PinLength),
}

/// Result of first-time registration
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub identity_id: IdentityId,
    pub pin_length: PinLength,
}

/// Result of restoring a credential from the remote identity
#[derive(Debug, Clone, Serialize)]
pub struct Restored {
    pub identity_id: IdentityId,
    pub pin_length: PinLength,
    pub device_binding: DeviceBinding,
}

/// PIN lifecycle manager
pub struct PinService {
    store: Arc<dyn SecureStore>,
    fingerprint: Arc<FingerprintService>,
    identity_store: Arc<dyn RemoteIdentityStore>,
    logger: Option<Arc<LoggingService>>,
}

impl PinService {
    pub fn new(
        store: Arc<dyn SecureStore>,
        fingerprint: Arc<FingerprintService>,
        identity_store: Arc<dyn RemoteIdentityStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            store,
            fingerprint,
            identity_store,
            logger,
        }
    }

    fn log(&self, event: LogEvent) {
        record(self.logger.as_deref(), event);
    }

    /// Hash a validated PIN with a fresh salt. Nothing is persisted.
    fn hash_new_pin(pin: &str) -> Result<PinCredential> {
        pin_policy::validate(pin)
            .into_result()
            .map_err(Error::WeakPin)?;

        let length = PinLength::from_len(pin.len())
            .ok_or(Error::WeakPin(pin_policy::PinRejection::InvalidLength))?;
        let salt = hashing::generate_salt();
        let hash = hashing::hash_pin(pin, &salt);
        Ok(PinCredential::new(hash, salt, length))
    }

    async fn save_credential(&self, credential: &PinCredential) -> Result<()> {
        let json = serde_json::to_string(credential)?;
        self.store.set(PIN_CREDENTIAL_KEY, &json).await
    }

    /// Load the stored credential
    ///
    /// A record that exists but cannot be parsed is a storage failure, not
    /// an absent credential.
    pub(crate) async fn load_credential(&self) -> Result<Option<PinCredential>> {
        match self.store.get(PIN_CREDENTIAL_KEY).await? {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| Error::storage(format!("Corrupt PIN credential: {}", e))),
        }
    }

    /// Create the first local PIN
    ///
    /// Fails with `WeakPin` before anything is written, and with
    /// `AlreadyConfigured` when a PIN exists; replacing one goes through
    /// `change_pin`.
    pub async fn create_pin(&self, pin: &str) -> Result<PinLength> {
        if self.has_pin().await? {
            return Err(Error::AlreadyConfigured);
        }
        self.save_new_pin(pin).await
    }

    async fn save_new_pin(&self, pin: &str) -> Result<PinLength> {
        let credential = match Self::hash_new_pin(pin) {
            Ok(c) => c,
            Err(e) => {
                self.log(LogEvent::new("pin_rejected").with_error(e.to_string()));
                return Err(e);
            }
        };

        self.save_credential(&credential).await?;
        self.log(LogEvent::new("pin_created"));
        Ok(credential.pin_length)
    }

    /// First-time account setup: create the remote identity, then persist locally
    pub async fn register(&self, phone: &str, pin: &str) -> Result<Registration> {
        if self.has_pin().await? {
            return Err(Error::AlreadyConfigured);
        }
        let phone = normalize_phone(phone)?;
        let credential = Self::hash_new_pin(pin)?;
        let device_id = self.fingerprint.get_or_create().await?;

        let new_identity = NewIdentity {
            phone: phone.clone(),
            pin_hash: credential.pin_hash.clone(),
            pin_salt: credential.pin_salt.clone(),
            pin_length: credential.pin_length,
            device_id: device_id.as_str().to_string(),
        };

        let identity_id = match self.identity_store.create_identity(&new_identity).await {
            Ok(id) => id,
            Err(e) => {
                // The duplicate error carries the phone number
                let message = match &e {
                    Error::DuplicateIdentity(_) => "identity already registered".to_string(),
                    other => other.to_string(),
                };
                self.log(LogEvent::new("register_failed").with_error(message));
                return Err(e);
            }
        };

        self.save_credential(&credential).await?;
        self.save_identity_link(&IdentityLink {
            identity_id: identity_id.clone(),
            phone,
        })
        .await?;

        self.log(LogEvent::new("identity_registered"));
        Ok(Registration {
            identity_id,
            pin_length: credential.pin_length,
        })
    }

    /// Check a PIN against the stored credential
    pub(crate) async fn check_pin(&self, pin: &str) -> Result<PinCheck> {
        let credential = match self.load_credential().await? {
            Some(c) if c.is_complete() => c,
            _ => return Ok(PinCheck::NotConfigured),
        };

        if hashing::matches(pin, &credential.pin_salt, &credential.pin_hash) {
            Ok(PinCheck::Match)
        } else {
            Ok(PinCheck::Mismatch)
        }
    }

    /// `true` only when the PIN matches the stored credential
    #[cfg(test)]
    pub(crate) async fn verify_pin(&self, pin: &str) -> Result<bool> {
        Ok(self.check_pin(pin).await? == PinCheck::Match)
    }

    /// Replace the PIN after confirming the current one
    pub(crate) async fn change_pin(&self, current: &str, new_pin: &str) -> Result<PinLength> {
        self.require_match(current).await?;
        self.save_new_pin(new_pin).await
    }

    /// Switch to a different PIN length with a new PIN of that length
    pub(crate) async fn change_pin_length(
        &self,
        current: &str,
        new_pin: &str,
        length: PinLength,
    ) -> Result<PinLength> {
        self.require_match(current).await?;
        pin_policy::validate_for_length(new_pin, length)
            .into_result()
            .map_err(Error::WeakPin)?;
        self.save_new_pin(new_pin).await
    }

    async fn require_match(&self, pin: &str) -> Result<()> {
        match self.check_pin(pin).await? {
            PinCheck::Match => Ok(()),
            PinCheck::Mismatch => Err(Error::Mismatch),
            PinCheck::NotConfigured => Err(Error::NotConfigured),
        }
    }

    /// Re-authenticate against the remote identity (e.g. after a reinstall)
    ///
    /// On success the remote hash/salt pair becomes the local credential.
    /// A device mismatch is reported, not enforced.
    pub(crate) async fn restore(&self, phone: &str, pin: &str) -> Result<Restored> {
        let phone = normalize_phone(phone)?;
        let remote = self
            .identity_store
            .get_identity_by_phone(&phone)
            .await?
            .ok_or(Error::NotConfigured)?;

        if !hashing::matches(pin, &remote.pin_salt, &remote.pin_hash) {
            self.log(LogEvent::new("restore_mismatch"));
            return Err(Error::Mismatch);
        }

        let credential = PinCredential::new(remote.pin_hash, remote.pin_salt, remote.pin_length);
        self.save_credential(&credential).await?;
        self.save_identity_link(&IdentityLink {
            identity_id: remote.identity_id.clone(),
            phone,
        })
        .await?;

        let device_id = self.fingerprint.get_or_create().await?;
        let device_binding = if self
            .identity_store
            .verify_device_binding(&remote.identity_id, device_id.as_str())
            .await?
        {
            DeviceBinding::Matched
        } else {
            self.log(LogEvent::new("device_mismatch").with_error(Error::DeviceMismatch.to_string()));
            DeviceBinding::Mismatch
        };

        self.log(LogEvent::new("identity_restored"));
        Ok(Restored {
            identity_id: remote.identity_id,
            pin_length: credential.pin_length,
            device_binding,
        })
    }

    async fn save_identity_link(&self, link: &IdentityLink) -> Result<()> {
        let json = serde_json::to_string(link)?;
        self.store.set(IDENTITY_LINK_KEY, &json).await
    }

    /// The remote identity this installation is linked to, if any
    pub async fn identity_link(&self) -> Result<Option<IdentityLink>> {
        match self.store.get(IDENTITY_LINK_KEY).await? {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| Error::storage(format!("Corrupt identity link: {}", e))),
        }
    }

    pub async fn has_pin(&self) -> Result<bool> {
        Ok(self.load_credential().await?.is_some_and(|c| c.is_complete()))
    }

    /// Length of a usable credential; `None` when absent or incomplete
    pub async fn pin_length(&self) -> Result<Option<PinLength>> {
        Ok(self
            .load_credential()
            .await?
            .filter(|c| c.is_complete())
            .map(|c| c.pin_length))
    }

    /// Lifecycle state given the current session
    pub async fn state(&self, session: &SessionContext) -> Result<PinState> {
        Ok(match self.load_credential().await? {
            Some(c) if c.is_complete() => {
                if session.is_pin_verified() {
                    PinState::Verified(c.pin_length)
                } else {
                    PinState::Locked(c.pin_length)
                }
            }
            _ => PinState::NoPin,
        })
    }

    /// Wipe every secret held by this installation
    pub async fn clear(&self) -> Result<()> {
        self.store.delete_all().await?;
        self.log(LogEvent::new("credentials_cleared"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::DemoIdentityStore;
    use crate::adapters::memory::MemorySecureStore;
    use crate::adapters::platform::NoDeviceId;
    use crate::domain::PinRejection;

    struct Fixture {
        store: Arc<MemorySecureStore>,
        remote: Arc<DemoIdentityStore>,
        service: PinService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemorySecureStore::new());
        let remote = Arc::new(DemoIdentityStore::new());
        let fingerprint = Arc::new(FingerprintService::new(store.clone(), Arc::new(NoDeviceId)));
        let service = PinService::new(store.clone(), fingerprint, remote.clone(), None);
        Fixture {
            store,
            remote,
            service,
        }
    }

    #[tokio::test]
    async fn test_create_then_verify() {
        for pin in ["4821", "193746"] {
            let f = fixture();
            f.service.create_pin(pin).await.unwrap();
            assert!(f.service.verify_pin(pin).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_create_refuses_existing_pin() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();
        let before = f.service.load_credential().await.unwrap().unwrap();

        assert!(matches!(
            f.service.create_pin("135790").await,
            Err(Error::AlreadyConfigured)
        ));
        assert_eq!(f.service.load_credential().await.unwrap().unwrap(), before);
        assert!(!f.service.verify_pin("135790").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_refuses_existing_pin() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();

        assert!(matches!(
            f.service.register("+15550109999", "135790").await,
            Err(Error::AlreadyConfigured)
        ));
        assert!(f.remote.is_empty());
        assert!(f.service.verify_pin("4821").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_pin_is_false_not_error() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();
        assert!(!f.service.verify_pin("4822").await.unwrap());
        assert_eq!(f.service.check_pin("4822").await.unwrap(), PinCheck::Mismatch);
    }

    #[tokio::test]
    async fn test_weak_pin_writes_nothing() {
        let f = fixture();
        let err = f.service.create_pin("1111").await.unwrap_err();
        assert!(matches!(err, Error::WeakPin(PinRejection::Repeated)));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_verify_without_credential() {
        let f = fixture();
        assert_eq!(f.service.check_pin("4821").await.unwrap(), PinCheck::NotConfigured);
        assert!(!f.service.verify_pin("4821").await.unwrap());
    }

    #[tokio::test]
    async fn test_credential_without_salt_cannot_verify() {
        let f = fixture();
        let hash = hashing::hash_pin("4821", "");
        let cred = PinCredential::new(hash, String::new(), PinLength::Four);
        f.store
            .set(PIN_CREDENTIAL_KEY, &serde_json::to_string(&cred).unwrap())
            .await
            .unwrap();
        assert_eq!(f.service.check_pin("4821").await.unwrap(), PinCheck::NotConfigured);
        assert!(!f.service.has_pin().await.unwrap());
        assert_eq!(f.service.pin_length().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();
        f.store.set_unavailable(true);
        assert!(matches!(
            f.service.verify_pin("4821").await,
            Err(Error::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_storage_error() {
        let f = fixture();
        f.store.set(PIN_CREDENTIAL_KEY, "not json").await.unwrap();
        assert!(matches!(
            f.service.check_pin("4821").await,
            Err(Error::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_salt_is_stable_across_verifications() {
        let f = fixture();
        f.service.create_pin("482917").await.unwrap();
        let before = f.service.load_credential().await.unwrap().unwrap();

        for _ in 0..3 {
            assert!(f.service.verify_pin("482917").await.unwrap());
            assert!(!f.service.verify_pin("482918").await.unwrap());
        }

        let after = f.service.load_credential().await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_replacing_uses_fresh_salt() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();
        let first = f.service.load_credential().await.unwrap().unwrap();
        f.service.change_pin("4821", "4821").await.unwrap();
        let second = f.service.load_credential().await.unwrap().unwrap();

        assert_ne!(first.pin_salt, second.pin_salt);
        assert_ne!(first.pin_hash, second.pin_hash);
    }

    #[tokio::test]
    async fn test_change_pin_requires_current() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();

        assert!(matches!(
            f.service.change_pin("0000", "193746").await,
            Err(Error::Mismatch)
        ));
        assert!(f.service.verify_pin("4821").await.unwrap());

        assert_eq!(
            f.service.change_pin("4821", "193746").await.unwrap(),
            PinLength::Six
        );
        assert!(!f.service.verify_pin("4821").await.unwrap());
        assert!(f.service.verify_pin("193746").await.unwrap());
    }

    #[tokio::test]
    async fn test_change_pin_length_checks_new_length() {
        let f = fixture();
        f.service.create_pin("4821").await.unwrap();

        let err = f
            .service
            .change_pin_length("4821", "9371", PinLength::Six)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WeakPin(PinRejection::LengthMismatch)));

        f.service
            .change_pin_length("4821", "937164", PinLength::Six)
            .await
            .unwrap();
        assert_eq!(f.service.pin_length().await.unwrap(), Some(PinLength::Six));
    }

    #[tokio::test]
    async fn test_register_sends_hash_salt_and_device() {
        let f = fixture();
        let reg = f.service.register("+1 555 010 9999", "482917").await.unwrap();

        let remote = f.remote.get_identity_by_phone("+15550109999").await.unwrap().unwrap();
        let local = f.service.load_credential().await.unwrap().unwrap();
        assert_eq!(remote.identity_id, reg.identity_id);
        assert_eq!(remote.pin_hash, local.pin_hash);
        assert_eq!(remote.pin_salt, local.pin_salt);
        assert_eq!(remote.device_id.len(), 64);

        let link = f.service.identity_link().await.unwrap().unwrap();
        assert_eq!(link.phone, "+15550109999");
    }

    #[tokio::test]
    async fn test_register_duplicate_phone() {
        let f = fixture();
        f.service.register("+15550109999", "482917").await.unwrap();

        let other = fixture_with_remote(f.remote.clone());
        let err = other.register("+15550109999", "193746").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity(_)));
        assert!(!other.has_pin().await.unwrap());
    }

    fn fixture_with_remote(remote: Arc<DemoIdentityStore>) -> PinService {
        let store = Arc::new(MemorySecureStore::new());
        let fingerprint = Arc::new(FingerprintService::new(store.clone(), Arc::new(NoDeviceId)));
        PinService::new(store, fingerprint, remote, None)
    }

    #[tokio::test]
    async fn test_restore_on_new_device() {
        let f = fixture();
        f.service.register("+15550109999", "482917").await.unwrap();

        // Fresh install with a different random device id
        let reinstalled = fixture_with_remote(f.remote.clone());
        assert!(matches!(
            reinstalled.restore("+15550109999", "000001").await,
            Err(Error::Mismatch)
        ));

        let restored = reinstalled.restore("+15550109999", "482917").await.unwrap();
        assert_eq!(restored.device_binding, DeviceBinding::Mismatch);
        assert!(reinstalled.verify_pin("482917").await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_same_device() {
        let f = fixture();
        f.service.register("+15550109999", "482917").await.unwrap();

        let restored = f.service.restore("+15550109999", "482917").await.unwrap();
        assert_eq!(restored.device_binding, DeviceBinding::Matched);
    }

    #[tokio::test]
    async fn test_restore_unknown_phone() {
        let f = fixture();
        assert!(matches!(
            f.service.restore("+15550100000", "482917").await,
            Err(Error::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_state_follows_session() {
        let f = fixture();
        let mut session = SessionContext::new();
        assert_eq!(f.service.state(&session).await.unwrap(), PinState::NoPin);

        f.service.create_pin("4821").await.unwrap();
        assert_eq!(
            f.service.state(&session).await.unwrap(),
            PinState::Locked(PinLength::Four)
        );

        session.set_pin_verified(true);
        assert_eq!(
            f.service.state(&session).await.unwrap(),
            PinState::Verified(PinLength::Four)
        );
    }

    #[tokio::test]
    async fn test_clear_wipes_store() {
        let f = fixture();
        f.service.register("+15550109999", "482917").await.unwrap();
        f.service.clear().await.unwrap();
        assert!(f.store.is_empty());
        assert!(!f.service.has_pin().await.unwrap());
    }
}
