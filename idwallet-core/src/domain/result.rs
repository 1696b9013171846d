//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pin_policy::PinRejection;

/// Core library error type
///
/// A wrong PIN is not an error: `check_pin` and step-up outcomes report it as a
/// normal result. `Mismatch` exists for flows that must fail as a whole
/// (changing a PIN with the wrong current PIN, restoring with a wrong PIN).
#[derive(Error, Debug)]
pub enum Error {
    #[error("PIN rejected: {0}")]
    WeakPin(PinRejection),

    #[error("PIN does not match")]
    Mismatch,

    #[error("No PIN is configured on this device")]
    NotConfigured,

    #[error("A PIN is already configured; change it with the current PIN")]
    AlreadyConfigured,

    #[error("Too many failed PIN attempts; recover with a one-time code")]
    LockedOut,

    #[error("Identity already registered: {0}")]
    DuplicateIdentity(String),

    #[error("Device fingerprint does not match the registered device")]
    DeviceMismatch,

    #[error("Secure storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create a remote service error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the user can simply be re-prompted (no retry affordance needed)
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WeakPin(_)
                | Self::Mismatch
                | Self::NotConfigured
                | Self::AlreadyConfigured
                | Self::DuplicateIdentity(_)
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for FFI serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert(
                    "recoverable".to_string(),
                    serde_json::Value::Bool(e.is_user_recoverable()),
                );
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_from_result_marks_recoverable() {
        let err: Result<i32> = Err(Error::WeakPin(PinRejection::Repeated));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("PIN rejected"));
        let context = result.context.unwrap();
        assert_eq!(context["recoverable"], serde_json::Value::Bool(true));

        let err: Result<i32> = Err(Error::storage("keychain locked"));
        let result: OperationResult<i32> = err.into();
        assert_eq!(
            result.context.unwrap()["recoverable"],
            serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn test_lockout_needs_recovery() {
        assert!(!Error::LockedOut.is_user_recoverable());
        assert!(Error::AlreadyConfigured.is_user_recoverable());
    }
}
