//! Platform capability ports
//!
//! Capabilities differ between targets (native mobile, desktop, web). The
//! core receives one implementation of each, chosen at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::result::Result;

/// Biometric assertion capability (Face ID, fingerprint, Windows Hello)
#[async_trait]
pub trait BiometricCapability: Send + Sync {
    /// Whether the device has enrolled biometrics that can be used now
    async fn is_available(&self) -> bool;

    /// Prompt the user. `Ok(false)` when the user fails or cancels.
    async fn authenticate(&self, prompt: &str) -> Result<bool>;
}

/// Source of a platform-native stable device identifier
pub trait DeviceIdSource: Send + Sync {
    /// Raw vendor/hardware identifier, if the platform exposes one
    fn platform_id(&self) -> Option<String>;
}

/// Wall clock
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
