//! PIN policy - rejects weak PINs at creation time

use std::fmt;

use serde::{Deserialize, Serialize};

use super::credential::PinLength;

const ASCENDING: &str = "0123456789";
const DESCENDING: &str = "9876543210";

/// Why a PIN was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRejection {
    NonDigit,
    InvalidLength,
    Sequential,
    Repeated,
    LengthMismatch,
}

impl fmt::Display for PinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PinRejection::NonDigit => "PIN must contain only digits",
            PinRejection::InvalidLength => "PIN must be exactly 4 or 6 digits",
            PinRejection::Sequential => "PIN cannot be a sequence like 1234 or 4321",
            PinRejection::Repeated => "PIN cannot repeat a single digit",
            PinRejection::LengthMismatch => "PIN length does not match the selected length",
        };
        f.write_str(msg)
    }
}

/// Outcome of validating a candidate PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinValidation {
    pub valid: bool,
    pub reason: Option<PinRejection>,
}

impl PinValidation {
    fn accept() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn reject(reason: PinRejection) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }

    /// Convert into a `Result`, for callers that want `?`
    pub fn into_result(self) -> Result<(), PinRejection> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Validate a candidate PIN. Rules are checked in order; the first failure wins.
pub fn validate(pin: &str) -> PinValidation {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return PinValidation::reject(PinRejection::NonDigit);
    }

    if PinLength::from_len(pin.len()).is_none() {
        return PinValidation::reject(PinRejection::InvalidLength);
    }

    if ASCENDING.contains(pin) || DESCENDING.contains(pin) {
        return PinValidation::reject(PinRejection::Sequential);
    }

    let first = pin.as_bytes()[0];
    if pin.bytes().all(|b| b == first) {
        return PinValidation::reject(PinRejection::Repeated);
    }

    PinValidation::accept()
}

/// Validate a PIN against a length the user already picked
pub fn validate_for_length(pin: &str, expected: PinLength) -> PinValidation {
    let validation = validate(pin);
    if validation.valid && pin.len() != expected.digits() {
        return PinValidation::reject(PinRejection::LengthMismatch);
    }
    validation
}
