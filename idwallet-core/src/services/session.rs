//! Session monitor - relocks the app after a long absence

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::logging::{record, LogEvent, LoggingService};
use crate::domain::{AppState, LockDecision, SessionContext};
use crate::ports::Clock;

/// Default time in the background before the PIN is required again
pub const DEFAULT_AUTO_LOCK_MINUTES: i64 = 5;

/// Watches foreground/background transitions
///
/// Only the most recent background timestamp is kept.
pub struct SessionMonitor {
    clock: Arc<dyn Clock>,
    threshold: Duration,
    backgrounded_at: Option<DateTime<Utc>>,
    logger: Option<Arc<LoggingService>>,
}

impl SessionMonitor {
    pub fn new(clock: Arc<dyn Clock>, threshold: Duration) -> Self {
        Self {
            clock,
            threshold,
            backgrounded_at: None,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn backgrounded_at(&self) -> Option<DateTime<Utc>> {
        self.backgrounded_at
    }

    /// Feed a platform lifecycle event
    ///
    /// Leaving the foreground records the time. Returning relocks a
    /// PIN-protected authenticated session when the absence exceeded the
    /// threshold.
    pub fn on_app_state_change(
        &mut self,
        state: AppState,
        session: &mut SessionContext,
    ) -> LockDecision {
        match state {
            AppState::Inactive | AppState::Background => {
                self.backgrounded_at = Some(self.clock.now());
                LockDecision::Stay
            }
            AppState::Active => {
                let Some(left_at) = self.backgrounded_at.take() else {
                    return LockDecision::Stay;
                };

                let elapsed = self.clock.now() - left_at;
                if elapsed > self.threshold && session.is_authenticated() && session.has_pin() {
                    session.set_pin_verified(false);
                    record(
                        self.logger.as_deref(),
                        LogEvent::new("auto_lock").with_action("relock"),
                    );
                    LockDecision::Relock
                } else {
                    LockDecision::Stay
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::platform::ManualClock;

    fn unlocked_session() -> SessionContext {
        let mut session = SessionContext::new();
        session.set_authenticated(true);
        session.set_has_pin(true);
        session.set_pin_verified(true);
        session
    }

    fn monitor() -> (Arc<ManualClock>, SessionMonitor) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let monitor = SessionMonitor::new(
            clock.clone(),
            Duration::minutes(DEFAULT_AUTO_LOCK_MINUTES),
        );
        (clock, monitor)
    }

    #[test]
    fn test_relock_after_six_minutes() {
        let (clock, mut monitor) = monitor();
        let mut session = unlocked_session();

        monitor.on_app_state_change(AppState::Background, &mut session);
        clock.advance(Duration::minutes(6));
        let decision = monitor.on_app_state_change(AppState::Active, &mut session);

        assert_eq!(decision, LockDecision::Relock);
        assert!(!session.is_pin_verified());
        assert!(session.requires_unlock());
    }

    #[test]
    fn test_short_absence_stays_unlocked() {
        let (clock, mut monitor) = monitor();
        let mut session = unlocked_session();

        monitor.on_app_state_change(AppState::Inactive, &mut session);
        clock.advance(Duration::minutes(4));
        assert_eq!(
            monitor.on_app_state_change(AppState::Active, &mut session),
            LockDecision::Stay
        );
        assert!(session.is_pin_verified());
    }

    #[test]
    fn test_exactly_threshold_does_not_relock() {
        let (clock, mut monitor) = monitor();
        let mut session = unlocked_session();

        monitor.on_app_state_change(AppState::Background, &mut session);
        clock.advance(Duration::minutes(5));
        assert_eq!(
            monitor.on_app_state_change(AppState::Active, &mut session),
            LockDecision::Stay
        );
    }

    #[test]
    fn test_latest_background_timestamp_wins() {
        let (clock, mut monitor) = monitor();
        let mut session = unlocked_session();

        monitor.on_app_state_change(AppState::Inactive, &mut session);
        clock.advance(Duration::minutes(4));
        monitor.on_app_state_change(AppState::Background, &mut session);
        clock.advance(Duration::minutes(4));

        assert_eq!(
            monitor.on_app_state_change(AppState::Active, &mut session),
            LockDecision::Stay
        );
    }

    #[test]
    fn test_no_relock_without_pin() {
        let (clock, mut monitor) = monitor();
        let mut session = SessionContext::new();
        session.set_authenticated(true);

        monitor.on_app_state_change(AppState::Background, &mut session);
        clock.advance(Duration::minutes(30));
        assert_eq!(
            monitor.on_app_state_change(AppState::Active, &mut session),
            LockDecision::Stay
        );
    }

    #[test]
    fn test_active_without_background_is_noop() {
        let (_clock, mut monitor) = monitor();
        let mut session = unlocked_session();
        assert_eq!(
            monitor.on_app_state_change(AppState::Active, &mut session),
            LockDecision::Stay
        );
        assert!(monitor.backgrounded_at().is_none());
    }
}
