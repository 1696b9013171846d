//! Status service - wallet security summary

use std::sync::Arc;

use serde::Serialize;

use super::fingerprint::FingerprintService;
use super::pin::{PinService, PinState};
use crate::domain::result::Result;
use crate::domain::SessionContext;

/// Status service for the security summary
pub struct StatusService {
    pin: Arc<PinService>,
    fingerprint: Arc<FingerprintService>,
}

impl StatusService {
    pub fn new(pin: Arc<PinService>, fingerprint: Arc<FingerprintService>) -> Self {
        Self { pin, fingerprint }
    }

    /// Get overall status summary
    ///
    /// Read-only: no device fingerprint is created here.
    pub async fn get_status(&self, session: &SessionContext) -> Result<StatusSummary> {
        let pin = self.pin.state(session).await?;
        let link = self.pin.identity_link().await?;
        let device_id = self.fingerprint.get().await?;

        Ok(StatusSummary {
            pin,
            registered: link.is_some(),
            identity_id: link.as_ref().map(|l| l.identity_id.clone()),
            phone: link.map(|l| l.phone),
            device_id: device_id.map(|d| d.as_str().to_string()),
            session: *session,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub pin: PinState,
    pub registered: bool,
    pub identity_id: Option<String>,
    pub phone: Option<String>,
    pub device_id: Option<String>,
    pub session: SessionContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::DemoIdentityStore;
    use crate::adapters::memory::MemorySecureStore;
    use crate::adapters::platform::NoDeviceId;
    use crate::domain::PinLength;

    fn services() -> (Arc<PinService>, StatusService) {
        let store = Arc::new(MemorySecureStore::new());
        let fingerprint = Arc::new(FingerprintService::new(store.clone(), Arc::new(NoDeviceId)));
        let pin = Arc::new(PinService::new(
            store,
            fingerprint.clone(),
            Arc::new(DemoIdentityStore::new()),
            None,
        ));
        (pin.clone(), StatusService::new(pin, fingerprint))
    }

    #[tokio::test]
    async fn test_fresh_wallet() {
        let (_, status) = services();
        let summary = status.get_status(&SessionContext::new()).await.unwrap();
        assert_eq!(summary.pin, PinState::NoPin);
        assert!(!summary.registered);
        assert!(summary.device_id.is_none());
    }

    #[tokio::test]
    async fn test_registered_wallet() {
        let (pin, status) = services();
        pin.register("+15550109999", "482917").await.unwrap();

        let summary = status.get_status(&SessionContext::new()).await.unwrap();
        assert_eq!(summary.pin, PinState::Locked(PinLength::Six));
        assert!(summary.registered);
        assert_eq!(summary.phone.as_deref(), Some("+15550109999"));
        assert_eq!(summary.device_id.map(|d| d.len()), Some(64));
    }
}
