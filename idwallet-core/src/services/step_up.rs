//! Step-up verification for sensitive actions
//!
//! One verifier gates app unlock, transfers and balance reveals. Every call
//! re-verifies; an unlocked session does not pre-approve a transfer.
//!
//! The wallet PIN has one attempt counter shared by every action and by
//! remote restore. Each bank account's payment PIN has its own counter.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::logging::{record, LogEvent, LoggingService};
use super::pin::{PinCheck, PinService};
use crate::domain::result::Result;
use crate::domain::{normalize_phone, AttemptLimiter, AttemptStatus, IdentityToken, OtpHandle, SessionContext};
use crate::ports::{AccountPinStore, BiometricCapability, OtpProvider};

/// Action that needs a fresh verification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensitiveAction {
    AppUnlock,
    Transfer { account_id: String, amount: Decimal },
    BalanceReveal { account_id: String },
}

impl SensitiveAction {
    fn prompt(&self) -> String {
        match self {
            Self::AppUnlock => "Unlock wallet".to_string(),
            Self::Transfer { amount, .. } => format!("Confirm transfer of {}", amount),
            Self::BalanceReveal { .. } => "Show balance".to_string(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AppUnlock => "app_unlock",
            Self::Transfer { .. } => "transfer",
            Self::BalanceReveal { .. } => "balance_reveal",
        }
    }
}

/// Factor offered by the user
#[derive(Debug, Clone, Copy)]
pub enum StepUpFactor<'a> {
    Pin(&'a str),
    Biometric,
}

/// Result of a step-up attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepUpOutcome {
    Approved,
    Denied { attempts_remaining: u32 },
    LockedOut,
    NotConfigured,
    BiometricUnavailable,
}

impl StepUpOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Payment step-up verifier
pub struct StepUpVerifier {
    pin: Arc<PinService>,
    limiter: AttemptLimiter,
    account_limiters: HashMap<String, AttemptLimiter>,
    biometric: Arc<dyn BiometricCapability>,
    biometric_enabled: bool,
    otp: Arc<dyn OtpProvider>,
    accounts: Arc<dyn AccountPinStore>,
    logger: Option<Arc<LoggingService>>,
}

impl StepUpVerifier {
    pub fn new(
        pin: Arc<PinService>,
        limiter: AttemptLimiter,
        biometric: Arc<dyn BiometricCapability>,
        otp: Arc<dyn OtpProvider>,
        accounts: Arc<dyn AccountPinStore>,
    ) -> Self {
        Self {
            pin,
            limiter,
            account_limiters: HashMap::new(),
            biometric,
            biometric_enabled: false,
            otp,
            accounts,
            logger: None,
        }
    }

    /// Allow biometrics as an alternative to the PIN
    pub fn with_biometric_enabled(mut self, enabled: bool) -> Self {
        self.biometric_enabled = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.limiter.is_locked()
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.limiter.remaining()
    }

    /// Current counter state, for persisting across restarts
    pub fn limiter(&self) -> &AttemptLimiter {
        &self.limiter
    }

    /// Resume from a persisted counter
    pub fn restore_limiter(&mut self, limiter: AttemptLimiter) {
        self.limiter = limiter;
    }

    pub fn is_account_locked(&self, account_id: &str) -> bool {
        self.account_limiters
            .get(account_id)
            .is_some_and(AttemptLimiter::is_locked)
    }

    /// Payment PIN counters by account id
    pub fn account_limiters(&self) -> &HashMap<String, AttemptLimiter> {
        &self.account_limiters
    }

    pub fn restore_account_limiters(&mut self, limiters: HashMap<String, AttemptLimiter>) {
        self.account_limiters = limiters;
    }

    fn log(&self, event: LogEvent) {
        record(self.logger.as_deref(), event);
    }

    /// Verify the user for one sensitive action
    pub async fn authorize(
        &mut self,
        action: &SensitiveAction,
        factor: StepUpFactor<'_>,
        session: &mut SessionContext,
    ) -> Result<StepUpOutcome> {
        if self.limiter.is_locked() {
            return Ok(StepUpOutcome::LockedOut);
        }

        let outcome = match factor {
            StepUpFactor::Pin(pin) => match self.pin.check_pin(pin).await? {
                PinCheck::NotConfigured => StepUpOutcome::NotConfigured,
                PinCheck::Match => self.approve(),
                PinCheck::Mismatch => self.deny(),
            },
            StepUpFactor::Biometric => {
                if !self.biometric_enabled || !self.biometric.is_available().await {
                    StepUpOutcome::BiometricUnavailable
                } else if self.biometric.authenticate(&action.prompt()).await? {
                    self.approve()
                } else {
                    // Biometric failures never count against the PIN
                    StepUpOutcome::Denied {
                        attempts_remaining: self.limiter.remaining(),
                    }
                }
            }
        };

        if *action == SensitiveAction::AppUnlock {
            match outcome {
                StepUpOutcome::Approved => session.set_pin_verified(true),
                StepUpOutcome::LockedOut => session.logout(),
                _ => {}
            }
        }

        self.log(
            LogEvent::new(format!("step_up_{}", outcome_name(&outcome))).with_action(action.name()),
        );
        Ok(outcome)
    }

    /// Count the result of a PIN comparison made outside `authorize`
    ///
    /// Restoring from the remote identity checks the PIN against the remote
    /// hash; the result goes through the wallet counter like any other
    /// entry. A lockout logs the session out.
    pub fn record_pin_check(
        &mut self,
        matched: bool,
        action: &'static str,
        session: &mut SessionContext,
    ) -> StepUpOutcome {
        if self.limiter.is_locked() {
            return StepUpOutcome::LockedOut;
        }

        let outcome = if matched { self.approve() } else { self.deny() };
        if outcome == StepUpOutcome::LockedOut {
            session.logout();
        }

        self.log(LogEvent::new(format!("step_up_{}", outcome_name(&outcome))).with_action(action));
        outcome
    }

    /// Verify the payment PIN of one bank account
    ///
    /// Failures count against that account only. A locked wallet refuses
    /// every account.
    pub async fn authorize_account(&mut self, account_id: &str, pin: &str) -> Result<StepUpOutcome> {
        if self.limiter.is_locked() || self.is_account_locked(account_id) {
            return Ok(StepUpOutcome::LockedOut);
        }

        let verified = self.accounts.verify_account_pin(account_id, pin).await?;

        let max_attempts = self.limiter.max_attempts();
        let limiter = self
            .account_limiters
            .entry(account_id.to_string())
            .or_insert_with(|| AttemptLimiter::new(max_attempts));
        let outcome = if verified {
            limiter.record_success();
            StepUpOutcome::Approved
        } else {
            outcome_for(limiter.record_failure())
        };

        if outcome == StepUpOutcome::LockedOut {
            self.log(LogEvent::new("lockout").with_action("account_pin"));
        }
        self.log(
            LogEvent::new(format!("step_up_{}", outcome_name(&outcome))).with_action("account_pin"),
        );
        Ok(outcome)
    }

    fn approve(&mut self) -> StepUpOutcome {
        self.limiter.record_success();
        StepUpOutcome::Approved
    }

    fn deny(&mut self) -> StepUpOutcome {
        let status = self.limiter.record_failure();
        if status == AttemptStatus::LockedOut {
            self.log(LogEvent::new("lockout"));
        }
        outcome_for(status)
    }

    /// Send a one-time code to the phone to escape a lockout
    pub async fn begin_recovery(&self, phone: &str) -> Result<OtpHandle> {
        let phone = normalize_phone(phone)?;
        let handle = self.otp.send(&phone).await?;
        self.log(LogEvent::new("recovery_started"));
        Ok(handle)
    }

    /// Confirm the one-time code
    ///
    /// On success the lockout is cleared and the session is authenticated
    /// and verified. A wrong code is `Ok(None)` and changes nothing.
    pub async fn complete_recovery(
        &mut self,
        handle: &OtpHandle,
        code: &str,
        session: &mut SessionContext,
    ) -> Result<Option<IdentityToken>> {
        let Some(token) = self.otp.confirm(handle, code).await? else {
            self.log(LogEvent::new("recovery_failed"));
            return Ok(None);
        };

        self.limiter.clear_lockout();
        self.account_limiters.clear();
        session.set_authenticated(true);
        session.set_has_pin(self.pin.has_pin().await?);
        session.set_pin_verified(true);
        self.log(LogEvent::new("recovery_completed"));
        Ok(Some(token))
    }
}

fn outcome_for(status: AttemptStatus) -> StepUpOutcome {
    match status {
        AttemptStatus::Remaining(n) => StepUpOutcome::Denied {
            attempts_remaining: n,
        },
        AttemptStatus::LockedOut | AttemptStatus::AlreadyLocked => StepUpOutcome::LockedOut,
    }
}

fn outcome_name(outcome: &StepUpOutcome) -> &'static str {
    match outcome {
        StepUpOutcome::Approved => "approved",
        StepUpOutcome::Denied { .. } => "denied",
        StepUpOutcome::LockedOut => "locked_out",
        StepUpOutcome::NotConfigured => "not_configured",
        StepUpOutcome::BiometricUnavailable => "biometric_unavailable",
    }
}
