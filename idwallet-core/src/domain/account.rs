//! Payment account domain model

use serde::{Deserialize, Serialize};

/// Bank/payment account gated by its own payment PIN
///
/// The payment PIN is independent of the app-unlock PIN. Its hash and salt
/// follow the same rules as `PinCredential` but are scoped to this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccount {
    pub account_id: String,
    pub label: String,
    #[serde(default)]
    pub payment_pin_hash: Option<String>,
    #[serde(default)]
    pub payment_pin_salt: Option<String>,
}

impl PaymentAccount {
    pub fn new(account_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            label: label.into(),
            payment_pin_hash: None,
            payment_pin_salt: None,
        }
    }

    /// Whether this account has a payment PIN set
    pub fn has_payment_pin(&self) -> bool {
        matches!(
            (&self.payment_pin_hash, &self.payment_pin_salt),
            (Some(hash), Some(salt)) if !hash.is_empty() && !salt.is_empty()
        )
    }
}
