//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod platform;
mod remote;
mod secure_store;

pub use platform::{BiometricCapability, Clock, DeviceIdSource, SystemClock};
pub use remote::{AccountPinStore, OtpProvider, RemoteIdentityStore};
pub use secure_store::SecureStore;
