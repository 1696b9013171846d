//! Core domain entities
//!
//! All security records are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod attempts;
mod credential;
mod device;
mod encryption;
mod identity;
pub mod pin_policy;
pub mod result;
pub mod session;

pub use account::PaymentAccount;
pub use attempts::{AttemptLimiter, AttemptStatus};
pub use credential::{IdentityLink, PinCredential, PinLength};
pub use device::{DeviceBinding, DeviceFingerprint};
pub use encryption::{Argon2Params, EncryptionMetadata, EncryptionStatus, KeySource};
pub use identity::{normalize_phone, IdentityId, IdentityToken, NewIdentity, OtpHandle, RemoteIdentity};
pub use pin_policy::{PinRejection, PinValidation};
pub use session::{AppState, LockDecision, SessionContext};
