//! idwallet core - PIN authentication and device binding for the wallet app
//!
//! This crate implements the security core following hexagonal architecture:
//!
//! - **domain**: Security records and validation (PinCredential, SessionContext, etc.)
//! - **ports**: Trait definitions for external collaborators (SecureStore, RemoteIdentityStore, ...)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (encrypted DuckDB, HTTP identity client, demo backend)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

mod log_migrations;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::demo::{DemoAccountPinStore, DemoIdentityStore, DemoOtpProvider};
use adapters::duckdb::DuckDbSecureStore;
use adapters::platform::{platform_biometric, platform_device_id_source};
use adapters::remote::{HttpIdentityClient, UnconfiguredRemote};
use config::Config;
use domain::result::{Error as DomainError, Result as DomainResult};
use ports::{
    AccountPinStore, BiometricCapability, Clock, DeviceIdSource, OtpProvider, RemoteIdentityStore,
    SecureStore, SystemClock,
};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AppState, AttemptLimiter, DeviceBinding, DeviceFingerprint, EncryptionStatus, LockDecision,
    PinCredential, PinLength, SessionContext,
};
pub use services::{PinCheck, PinState, SensitiveAction, StepUpFactor, StepUpOutcome};

/// Store key for the persisted failed-attempt counter
pub const ATTEMPTS_KEY: &str = "pin_attempts";

/// Store key for the per-account payment PIN counters
pub const ACCOUNT_ATTEMPTS_KEY: &str = "account_pin_attempts";

/// External collaborators of a wallet context
///
/// Production wiring comes from `WalletContext::open`; tests assemble their
/// own.
pub struct Collaborators {
    pub store: Arc<dyn SecureStore>,
    pub identity_store: Arc<dyn RemoteIdentityStore>,
    pub otp: Arc<dyn OtpProvider>,
    pub accounts: Arc<dyn AccountPinStore>,
    pub biometric: Arc<dyn BiometricCapability>,
    pub device_ids: Arc<dyn DeviceIdSource>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Offline demo backend on top of `store`
    pub fn demo(store: Arc<dyn SecureStore>) -> DomainResult<Self> {
        let identities = Arc::new(DemoIdentityStore::new());
        Ok(Self {
            store,
            otp: Arc::new(DemoOtpProvider::with_identities(identities.clone())),
            identity_store: identities,
            accounts: Arc::new(DemoAccountPinStore::seeded()?),
            biometric: platform_biometric(),
            device_ids: platform_device_id_source(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Backend chosen from config: demo, HTTP, or none
    fn from_config(config: &Config, store: Arc<dyn SecureStore>) -> Result<Self> {
        if config.demo_mode {
            return Ok(Self::demo(store)?);
        }

        let (identity_store, otp, accounts) = match &config.remote.base_url {
            Some(url) => remote_ports(Arc::new(HttpIdentityClient::new(
                url,
                Duration::from_secs(config.remote.timeout_secs),
            )?)),
            None => remote_ports(Arc::new(UnconfiguredRemote)),
        };

        Ok(Self {
            store,
            identity_store,
            otp,
            accounts,
            biometric: platform_biometric(),
            device_ids: platform_device_id_source(),
            clock: Arc::new(SystemClock),
        })
    }
}

type RemotePorts = (
    Arc<dyn RemoteIdentityStore>,
    Arc<dyn OtpProvider>,
    Arc<dyn AccountPinStore>,
);

/// One backend serving all three remote ports
fn remote_ports<T>(backend: Arc<T>) -> RemotePorts
where
    T: RemoteIdentityStore + OtpProvider + AccountPinStore + 'static,
{
    let identity_store: Arc<dyn RemoteIdentityStore> = backend.clone();
    let otp: Arc<dyn OtpProvider> = backend.clone();
    let accounts: Arc<dyn AccountPinStore> = backend;
    (identity_store, otp, accounts)
}

/// Main context for wallet security operations
///
/// Owns the session state and every service. Mutating operations take
/// `&mut self`, so one flow runs at a time.
pub struct WalletContext {
    pub config: Config,
    pub session: SessionContext,
    pub store: Arc<dyn SecureStore>,
    pub fingerprint: Arc<FingerprintService>,
    pub pin_service: Arc<PinService>,
    pub status_service: StatusService,
    pub step_up: StepUpVerifier,
    pub session_monitor: SessionMonitor,
    pub logger: Option<Arc<LoggingService>>,
}

impl WalletContext {
    /// Open the wallet in `wallet_dir`
    ///
    /// `store_key` is the hex key for the encrypted store (see
    /// `EncryptionService::resolve_key`).
    pub fn open(
        wallet_dir: &Path,
        store_key: &str,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let config = Config::load(wallet_dir)?;
        let store: Arc<dyn SecureStore> =
            Arc::new(DuckDbSecureStore::open(&store_path(wallet_dir, &config), store_key)?);
        let collaborators = Collaborators::from_config(&config, store)?;
        Ok(Self::with_collaborators(config, collaborators, logger))
    }

    /// Assemble a context from explicit collaborators
    pub fn with_collaborators(
        config: Config,
        collaborators: Collaborators,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let Collaborators {
            store,
            identity_store,
            otp,
            accounts,
            biometric,
            device_ids,
            clock,
        } = collaborators;

        let fingerprint = Arc::new(FingerprintService::new(store.clone(), device_ids));
        let pin_service = Arc::new(PinService::new(
            store.clone(),
            fingerprint.clone(),
            identity_store,
            logger.clone(),
        ));
        let status_service = StatusService::new(pin_service.clone(), fingerprint.clone());
        let step_up = StepUpVerifier::new(
            pin_service.clone(),
            AttemptLimiter::new(config.security.max_pin_attempts),
            biometric,
            otp,
            accounts,
        )
        .with_biometric_enabled(config.security.biometric_step_up)
        .with_logger(logger.clone());
        let session_monitor = SessionMonitor::new(
            clock,
            chrono::Duration::minutes(i64::from(config.security.auto_lock_minutes)),
        )
        .with_logger(logger.clone());

        Self {
            config,
            session: SessionContext::new(),
            store,
            fingerprint,
            pin_service,
            status_service,
            step_up,
            session_monitor,
            logger,
        }
    }

    /// Rebuild the session from persisted state on launch
    ///
    /// The wallet starts locked: a configured PIN must be entered again.
    pub async fn restore_session(&mut self) -> DomainResult<()> {
        let has_pin = self.pin_service.has_pin().await?;
        let linked = self.pin_service.identity_link().await?.is_some();

        self.session.logout();
        self.session.set_authenticated(has_pin || linked);
        self.session.set_has_pin(has_pin);

        if let Some(json) = self.store.get(ATTEMPTS_KEY).await? {
            let limiter: AttemptLimiter = serde_json::from_str(&json)?;
            self.step_up.restore_limiter(limiter);
        }
        if let Some(json) = self.store.get(ACCOUNT_ATTEMPTS_KEY).await? {
            let limiters: HashMap<String, AttemptLimiter> = serde_json::from_str(&json)?;
            self.step_up.restore_account_limiters(limiters);
        }
        Ok(())
    }

    async fn save_attempts(&self) -> DomainResult<()> {
        let json = serde_json::to_string(self.step_up.limiter())?;
        self.store.set(ATTEMPTS_KEY, &json).await
    }

    async fn save_account_attempts(&self) -> DomainResult<()> {
        let json = serde_json::to_string(self.step_up.account_limiters())?;
        self.store.set(ACCOUNT_ATTEMPTS_KEY, &json).await
    }

    /// Only a first PIN may be set without the current one
    async fn require_no_pin(&self) -> DomainResult<()> {
        if self.step_up.is_locked() {
            return Err(DomainError::LockedOut);
        }
        if self.pin_service.has_pin().await? {
            return Err(DomainError::AlreadyConfigured);
        }
        Ok(())
    }

    /// Run the current PIN through the wallet counter
    async fn require_current_pin(&mut self, current: &str) -> DomainResult<()> {
        match self.unlock(StepUpFactor::Pin(current)).await? {
            StepUpOutcome::Approved => Ok(()),
            StepUpOutcome::LockedOut => Err(DomainError::LockedOut),
            StepUpOutcome::NotConfigured => Err(DomainError::NotConfigured),
            StepUpOutcome::Denied { .. } | StepUpOutcome::BiometricUnavailable => {
                Err(DomainError::Mismatch)
            }
        }
    }

    fn enter_verified_session(&mut self) {
        self.session.set_authenticated(true);
        self.session.set_has_pin(true);
        self.session.set_pin_verified(true);
    }

    /// Create the first local PIN and open a verified session
    ///
    /// Refused while locked out or when a PIN already exists.
    pub async fn create_pin(&mut self, pin: &str) -> DomainResult<PinLength> {
        self.require_no_pin().await?;
        let length = self.pin_service.create_pin(pin).await?;
        self.enter_verified_session();
        Ok(length)
    }

    /// First-time registration against the identity service
    pub async fn register(&mut self, phone: &str, pin: &str) -> DomainResult<Registration> {
        self.require_no_pin().await?;
        let registration = self.pin_service.register(phone, pin).await?;
        self.enter_verified_session();
        Ok(registration)
    }

    /// Restore the credential from the identity service on this device
    ///
    /// The PIN check against the remote hash counts toward the lockout.
    pub async fn restore(&mut self, phone: &str, pin: &str) -> DomainResult<Restored> {
        if self.step_up.is_locked() {
            return Err(DomainError::LockedOut);
        }

        let restored = match self.pin_service.restore(phone, pin).await {
            Ok(restored) => Some(restored),
            Err(DomainError::Mismatch) => None,
            Err(e) => return Err(e),
        };

        let outcome =
            self.step_up
                .record_pin_check(restored.is_some(), "restore", &mut self.session);
        self.save_attempts().await?;

        match (outcome, restored) {
            (StepUpOutcome::Approved, Some(restored)) => {
                self.enter_verified_session();
                Ok(restored)
            }
            (StepUpOutcome::LockedOut, _) => Err(DomainError::LockedOut),
            _ => Err(DomainError::Mismatch),
        }
    }

    /// Replace the PIN after confirming the current one
    ///
    /// A wrong current PIN counts toward the lockout. A weak new PIN is
    /// rejected before the current one is checked.
    pub async fn change_pin(&mut self, current: &str, new_pin: &str) -> DomainResult<PinLength> {
        domain::pin_policy::validate(new_pin)
            .into_result()
            .map_err(DomainError::WeakPin)?;
        self.require_current_pin(current).await?;
        self.pin_service.change_pin(current, new_pin).await
    }

    /// Switch to a PIN of a different length after confirming the current one
    pub async fn change_pin_length(
        &mut self,
        current: &str,
        new_pin: &str,
        length: PinLength,
    ) -> DomainResult<PinLength> {
        domain::pin_policy::validate_for_length(new_pin, length)
            .into_result()
            .map_err(DomainError::WeakPin)?;
        self.require_current_pin(current).await?;
        self.pin_service
            .change_pin_length(current, new_pin, length)
            .await
    }

    /// Step-up verification; persists the attempt counter
    pub async fn authorize(
        &mut self,
        action: &SensitiveAction,
        factor: StepUpFactor<'_>,
    ) -> DomainResult<StepUpOutcome> {
        let outcome = self.step_up.authorize(action, factor, &mut self.session).await?;
        self.save_attempts().await?;
        Ok(outcome)
    }

    /// Unlock the app with a PIN or biometrics
    pub async fn unlock(&mut self, factor: StepUpFactor<'_>) -> DomainResult<StepUpOutcome> {
        self.authorize(&SensitiveAction::AppUnlock, factor).await
    }

    /// Verify a bank account's payment PIN; persists that account's counter
    pub async fn authorize_account(
        &mut self,
        account_id: &str,
        pin: &str,
    ) -> DomainResult<StepUpOutcome> {
        let outcome = self.step_up.authorize_account(account_id, pin).await?;
        self.save_account_attempts().await?;
        Ok(outcome)
    }

    /// Start OTP recovery from a lockout
    pub async fn begin_recovery(&self, phone: &str) -> DomainResult<domain::OtpHandle> {
        self.step_up.begin_recovery(phone).await
    }

    /// Finish OTP recovery. `false` on a wrong code.
    pub async fn complete_recovery(
        &mut self,
        handle: &domain::OtpHandle,
        code: &str,
    ) -> DomainResult<bool> {
        let token = self
            .step_up
            .complete_recovery(handle, code, &mut self.session)
            .await?;
        self.save_attempts().await?;
        self.save_account_attempts().await?;
        Ok(token.is_some())
    }

    /// Feed a platform lifecycle event to the auto-lock monitor
    pub fn on_app_state_change(&mut self, state: AppState) -> LockDecision {
        self.session_monitor
            .on_app_state_change(state, &mut self.session)
    }

    /// Security summary for display
    pub async fn status(&self) -> DomainResult<StatusSummary> {
        self.status_service.get_status(&self.session).await
    }

    /// Wipe every stored secret and log out
    pub async fn reset(&mut self) -> DomainResult<()> {
        self.pin_service.clear().await?;
        self.session.logout();
        self.step_up.restore_limiter(AttemptLimiter::new(
            self.config.security.max_pin_attempts,
        ));
        self.step_up.restore_account_limiters(HashMap::new());
        Ok(())
    }
}

/// Secure store file for the current mode
pub fn store_path(wallet_dir: &Path, config: &Config) -> PathBuf {
    let filename = if config.demo_mode {
        "demo.duckdb"
    } else {
        "vault.duckdb"
    };
    wallet_dir.join(filename)
}
