//! Remote collaborator ports
//!
//! Defines the interfaces for the remote identity store, the OTP provider
//! used as the lockout escalation path, and the server-side per-account
//! payment PIN check.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{IdentityId, IdentityToken, NewIdentity, OtpHandle, RemoteIdentity};

/// Remote identity store
#[async_trait]
pub trait RemoteIdentityStore: Send + Sync {
    /// Create a new identity
    ///
    /// Fails with `Error::DuplicateIdentity` when the phone is already registered.
    async fn create_identity(&self, identity: &NewIdentity) -> Result<IdentityId>;

    /// Look up an identity by normalized phone number
    async fn get_identity_by_phone(&self, phone: &str) -> Result<Option<RemoteIdentity>>;

    /// Whether the identity was registered from the given device
    async fn verify_device_binding(&self, identity_id: &str, device_id: &str) -> Result<bool>;
}

/// One-time-code provider
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Send a code to the phone and return a confirmation handle
    async fn send(&self, phone: &str) -> Result<OtpHandle>;

    /// Confirm a code. A wrong code is `Ok(None)`.
    async fn confirm(&self, handle: &OtpHandle, code: &str) -> Result<Option<IdentityToken>>;
}

/// Per-account payment PIN store
///
/// The hash/compare runs where the account record lives, with the same
/// salted SHA-256 scheme as the app-unlock PIN.
#[async_trait]
pub trait AccountPinStore: Send + Sync {
    /// Check a payment PIN for an account. A wrong PIN is `Ok(false)`.
    async fn verify_account_pin(&self, account_id: &str, pin: &str) -> Result<bool>;
}
