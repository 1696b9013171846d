//! Platform capability adapters
//!
//! Native biometric prompts are provided by the mobile shell through
//! `BiometricCapability`; builds without one get `UnsupportedBiometric`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::result::Result;
use crate::ports::{BiometricCapability, Clock, DeviceIdSource};

/// Reads the OS machine id (systemd / D-Bus)
#[derive(Debug, Clone)]
pub struct MachineIdSource {
    candidates: Vec<PathBuf>,
}

impl MachineIdSource {
    pub fn new() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("/etc/machine-id"),
                PathBuf::from("/var/lib/dbus/machine-id"),
            ],
        }
    }

    /// Read from custom paths instead of the system locations
    pub fn with_paths(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

impl Default for MachineIdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceIdSource for MachineIdSource {
    fn platform_id(&self) -> Option<String> {
        self.candidates.iter().find_map(|path| {
            let id = std::fs::read_to_string(path).ok()?;
            let id = id.trim();
            (!id.is_empty()).then(|| id.to_string())
        })
    }
}

/// Device id source with nothing to offer; forces a random identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceId;

impl DeviceIdSource for NoDeviceId {
    fn platform_id(&self) -> Option<String> {
        None
    }
}

/// Biometrics unavailable on this target
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedBiometric;

#[async_trait]
impl BiometricCapability for UnsupportedBiometric {
    async fn is_available(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|n| *n).unwrap_or_else(|e| *e.into_inner())
    }
}

/// Pick the device id source for the build target
pub fn platform_device_id_source() -> Arc<dyn DeviceIdSource> {
    if cfg!(target_os = "linux") {
        Arc::new(MachineIdSource::new())
    } else {
        Arc::new(NoDeviceId)
    }
}

/// Pick the biometric capability for the build target
pub fn platform_biometric() -> Arc<dyn BiometricCapability> {
    Arc::new(UnsupportedBiometric)
}
