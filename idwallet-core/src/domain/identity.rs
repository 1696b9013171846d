//! Remote identity domain models

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::credential::PinLength;
use super::result::{Error, Result};

/// Identifier assigned by the remote identity store
pub type IdentityId = String;

/// Server-side identity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIdentity {
    pub identity_id: IdentityId,
    pub phone: String,
    pub pin_hash: String,
    pub pin_salt: String,
    pub pin_length: PinLength,
    pub device_id: String,
}

/// Payload for creating an identity on first-time setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdentity {
    pub phone: String,
    pub pin_hash: String,
    pub pin_salt: String,
    pub pin_length: PinLength,
    pub device_id: String,
}

/// Opaque handle returned by the OTP provider for a pending confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpHandle(pub String);

/// Token proving a successful OTP confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityToken {
    pub identity_id: IdentityId,
    pub token: String,
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").expect("valid phone regex"))
}

/// Normalize a phone number to E.164 (`+` followed by digits)
///
/// Spaces, dashes, dots and parentheses are stripped. A leading `00`
/// international prefix is rewritten to `+`.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let mut phone: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if let Some(rest) = phone.strip_prefix("00") {
        phone = format!("+{}", rest);
    }

    if phone_regex().is_match(&phone) {
        Ok(phone)
    } else {
        Err(Error::validation(format!(
            "'{}' is not a valid international phone number",
            raw.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+1 (555) 010-9999").unwrap(), "+15550109999");
        assert_eq!(normalize_phone("0044 20 7946 0958").unwrap(), "+442079460958");
    }

    #[test]
    fn test_reject_local_numbers() {
        assert!(normalize_phone("555-0199").is_err());
        assert!(normalize_phone("+0123456789").is_err());
        assert!(normalize_phone("+1555abc0199").is_err());
    }
}
