//! Session state

use serde::{Deserialize, Serialize};

/// In-memory session state for one process lifetime
///
/// Owned by the composition root and changed only through the transition
/// methods below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    is_authenticated: bool,
    has_pin: bool,
    is_pin_verified: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn has_pin(&self) -> bool {
        self.has_pin
    }

    pub fn is_pin_verified(&self) -> bool {
        self.is_pin_verified
    }

    /// Whether the UI must show PIN/biometric entry before any action
    pub fn requires_unlock(&self) -> bool {
        self.is_authenticated && self.has_pin && !self.is_pin_verified
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.is_authenticated = authenticated;
        if !authenticated {
            self.is_pin_verified = false;
        }
    }

    pub fn set_has_pin(&mut self, has_pin: bool) {
        self.has_pin = has_pin;
        if !has_pin {
            self.is_pin_verified = false;
        }
    }

    /// Mark the current foreground session as verified (or not)
    ///
    /// Only a successful PIN or biometric check should pass `true`.
    pub fn set_pin_verified(&mut self, verified: bool) {
        self.is_pin_verified = verified;
    }

    pub fn logout(&mut self) {
        *self = Self::default();
    }
}

/// Application lifecycle state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// What the session monitor decided on return to foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockDecision {
    Stay,
    Relock,
}
