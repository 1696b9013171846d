//! Consecutive failed-attempt tracking

use serde::{Deserialize, Serialize};

/// Default number of consecutive failures before lockout
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Remaining(u32),
    /// Returned exactly once, on the failure that reaches the limit
    LockedOut,
    /// Already locked; the failure was not counted
    AlreadyLocked,
}

/// Bounded counter of consecutive failed verifications
///
/// The counter only resets on an explicit success or after the lockout is
/// cleared by a stronger re-authentication. Navigation does not reset it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLimiter {
    max_attempts: u32,
    failures: u32,
    locked: bool,
}

impl AttemptLimiter {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failures: 0,
            locked: false,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.failures)
    }

    /// Record a failed verification
    pub fn record_failure(&mut self) -> AttemptStatus {
        if self.locked {
            return AttemptStatus::AlreadyLocked;
        }

        self.failures += 1;
        if self.failures >= self.max_attempts {
            self.locked = true;
            AttemptStatus::LockedOut
        } else {
            AttemptStatus::Remaining(self.remaining())
        }
    }

    /// Record a successful verification. Has no effect while locked.
    pub fn record_success(&mut self) {
        if !self.locked {
            self.failures = 0;
        }
    }

    /// Clear the lockout after remote re-authentication succeeded
    pub fn clear_lockout(&mut self) {
        self.failures = 0;
        self.locked = false;
    }
}

impl Default for AttemptLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
