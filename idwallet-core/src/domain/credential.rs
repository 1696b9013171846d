//! Credential domain models

use serde::{Deserialize, Serialize};

/// Supported PIN lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PinLength {
    Four,
    Six,
}

impl PinLength {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            4 => Some(PinLength::Four),
            6 => Some(PinLength::Six),
            _ => None,
        }
    }

    pub fn digits(&self) -> usize {
        match self {
            PinLength::Four => 4,
            PinLength::Six => 6,
        }
    }
}

impl Default for PinLength {
    fn default() -> Self {
        PinLength::Six
    }
}

impl TryFrom<u8> for PinLength {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PinLength::from_len(value as usize)
            .ok_or_else(|| format!("unsupported PIN length {}", value))
    }
}

impl From<PinLength> for u8 {
    fn from(value: PinLength) -> Self {
        value.digits() as u8
    }
}

/// Hashed PIN credential as persisted in the secure store
///
/// Hash and salt are always serialized together as one record, so the store
/// can never hold a hash without the salt it was computed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinCredential {
    pub pin_hash: String,
    pub pin_salt: String,
    pub pin_length: PinLength,
}

impl PinCredential {
    pub fn new(pin_hash: String, pin_salt: String, pin_length: PinLength) -> Self {
        Self {
            pin_hash,
            pin_salt,
            pin_length,
        }
    }

    /// Whether the record carries enough material to verify against
    pub fn is_complete(&self) -> bool {
        !self.pin_hash.is_empty() && !self.pin_salt.is_empty()
    }
}

/// Locally cached link to the remote identity this installation belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityLink {
    pub identity_id: String,
    pub phone: String,
}
