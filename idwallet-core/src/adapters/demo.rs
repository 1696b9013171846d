//! Offline demo collaborators
//!
//! Stand-ins for the remote identity store, the OTP gateway and the
//! bank-side payment PIN check. Used in demo mode and in tests.
//! - Identities live in memory for the process lifetime
//! - Every OTP code is `DEMO_OTP_CODE`
//! - Demo accounts share the payment PIN `DEMO_PAYMENT_PIN`

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::pin_policy;
use crate::domain::result::{Error, Result};
use crate::domain::{IdentityId, IdentityToken, NewIdentity, OtpHandle, PaymentAccount, RemoteIdentity};
use crate::ports::{AccountPinStore, OtpProvider, RemoteIdentityStore};
use crate::services::hashing;

/// Code accepted by `DemoOtpProvider`
pub const DEMO_OTP_CODE: &str = "246810";

/// Payment PIN of the seeded demo accounts
pub const DEMO_PAYMENT_PIN: &str = "2580";

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| Error::remote(format!("Demo backend lock poisoned: {}", e)))
}

/// In-memory identity store keyed by phone
#[derive(Debug, Default)]
pub struct DemoIdentityStore {
    identities: Mutex<HashMap<String, RemoteIdentity>>,
}

impl DemoIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RemoteIdentityStore for DemoIdentityStore {
    async fn create_identity(&self, identity: &NewIdentity) -> Result<IdentityId> {
        let mut identities = lock(&self.identities)?;
        if identities.contains_key(&identity.phone) {
            return Err(Error::DuplicateIdentity(identity.phone.clone()));
        }

        let identity_id = Uuid::new_v4().to_string();
        identities.insert(
            identity.phone.clone(),
            RemoteIdentity {
                identity_id: identity_id.clone(),
                phone: identity.phone.clone(),
                pin_hash: identity.pin_hash.clone(),
                pin_salt: identity.pin_salt.clone(),
                pin_length: identity.pin_length,
                device_id: identity.device_id.clone(),
            },
        );
        Ok(identity_id)
    }

    async fn get_identity_by_phone(&self, phone: &str) -> Result<Option<RemoteIdentity>> {
        Ok(lock(&self.identities)?.get(phone).cloned())
    }

    async fn verify_device_binding(&self, identity_id: &str, device_id: &str) -> Result<bool> {
        Ok(lock(&self.identities)?
            .values()
            .find(|i| i.identity_id == identity_id)
            .is_some_and(|i| i.device_id == device_id))
    }
}

/// OTP provider that never sends anything and accepts one fixed code
#[derive(Debug, Default)]
pub struct DemoOtpProvider {
    pending: Mutex<HashMap<String, String>>,
    identities: Option<Arc<DemoIdentityStore>>,
}

impl DemoOtpProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve confirmed phones to identities registered in `identities`
    pub fn with_identities(identities: Arc<DemoIdentityStore>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            identities: Some(identities),
        }
    }
}

#[async_trait]
impl OtpProvider for DemoOtpProvider {
    async fn send(&self, phone: &str) -> Result<OtpHandle> {
        let handle = Uuid::new_v4().to_string();
        lock(&self.pending)?.insert(handle.clone(), phone.to_string());
        Ok(OtpHandle(handle))
    }

    async fn confirm(&self, handle: &OtpHandle, code: &str) -> Result<Option<IdentityToken>> {
        if code != DEMO_OTP_CODE {
            return Ok(None);
        }
        // Handles are single use
        let Some(phone) = lock(&self.pending)?.remove(&handle.0) else {
            return Ok(None);
        };

        let identity_id = match &self.identities {
            Some(store) => store
                .get_identity_by_phone(&phone)
                .await?
                .map(|i| i.identity_id)
                .unwrap_or_default(),
            None => String::new(),
        };

        Ok(Some(IdentityToken {
            identity_id,
            token: Uuid::new_v4().to_string(),
        }))
    }
}

/// Bank-side payment PIN records
#[derive(Debug, Default)]
pub struct DemoAccountPinStore {
    accounts: Mutex<HashMap<String, PaymentAccount>>,
}

impl DemoAccountPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two demo accounts protected by `DEMO_PAYMENT_PIN`
    pub fn seeded() -> Result<Self> {
        let store = Self::new();
        store.add_account(PaymentAccount::new("demo-checking", "Everyday Checking"))?;
        store.add_account(PaymentAccount::new("demo-savings", "Rainy Day Savings"))?;
        store.set_payment_pin("demo-checking", DEMO_PAYMENT_PIN)?;
        store.set_payment_pin("demo-savings", DEMO_PAYMENT_PIN)?;
        Ok(store)
    }

    pub fn add_account(&self, account: PaymentAccount) -> Result<()> {
        lock(&self.accounts)?.insert(account.account_id.clone(), account);
        Ok(())
    }

    /// Set the payment PIN, creating the account if needed
    pub fn set_payment_pin(&self, account_id: &str, pin: &str) -> Result<()> {
        pin_policy::validate(pin)
            .into_result()
            .map_err(Error::WeakPin)?;

        let salt = hashing::generate_salt();
        let hash = hashing::hash_pin(pin, &salt);

        let mut accounts = lock(&self.accounts)?;
        let account = accounts
            .entry(account_id.to_string())
            .or_insert_with(|| PaymentAccount::new(account_id, account_id));
        account.payment_pin_hash = Some(hash);
        account.payment_pin_salt = Some(salt);
        Ok(())
    }

    pub fn accounts(&self) -> Result<Vec<PaymentAccount>> {
        let mut accounts: Vec<_> = lock(&self.accounts)?.values().cloned().collect();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(accounts)
    }
}

#[async_trait]
impl AccountPinStore for DemoAccountPinStore {
    async fn verify_account_pin(&self, account_id: &str, pin: &str) -> Result<bool> {
        let accounts = lock(&self.accounts)?;
        let Some(account) = accounts.get(account_id) else {
            return Ok(false);
        };

        match (&account.payment_pin_salt, &account.payment_pin_hash) {
            (Some(salt), Some(hash)) => Ok(hashing::matches(pin, salt, hash)),
            _ => Ok(false),
        }
    }
}
