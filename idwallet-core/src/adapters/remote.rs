//! Remote identity service client
//!
//! JSON over HTTPS client for the identity backend. Implements the identity
//! store, the OTP gateway proxy and the per-account payment PIN check.
//!
//! Endpoints (relative to the base URL):
//! - POST /identities
//! - GET  /identities?phone=
//! - POST /identities/{id}/device-binding
//! - POST /otp/send
//! - POST /otp/confirm
//! - POST /accounts/{id}/verify-pin

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{IdentityId, IdentityToken, NewIdentity, OtpHandle, RemoteIdentity};
use crate::ports::{AccountPinStore, OtpProvider, RemoteIdentityStore};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Wire models
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedIdentity {
    identity_id: IdentityId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceBindingRequest<'a> {
    device_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeviceBindingResponse {
    matches: bool,
}

#[derive(Debug, Serialize)]
struct OtpSendRequest<'a> {
    phone: &'a str,
}

#[derive(Debug, Deserialize)]
struct OtpSendResponse {
    handle: String,
}

#[derive(Debug, Serialize)]
struct OtpConfirmRequest<'a> {
    handle: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyPinRequest<'a> {
    pin: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyPinResponse {
    valid: bool,
}

// =============================================================================
// HTTP client
// =============================================================================

/// Identity backend client
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpIdentityClient {
    /// Create a client for `base_url`
    ///
    /// Plain `http` is only accepted for loopback hosts.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid remote base URL: {}", base_url))?;

        match base_url.scheme() {
            "https" => {}
            "http" if is_loopback(&base_url) => {}
            scheme => anyhow::bail!(
                "Remote base URL must use https (got {}://{})",
                scheme,
                base_url.host_str().unwrap_or_default()
            ),
        }
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Remote base URL cannot be used as a base: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::remote(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::remote("Unable to connect to the identity service")
        } else {
            Error::remote(format!("Identity request failed: {}", error))
        }
    }

    fn check_response_status(&self, response: &Response) -> DomainResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(match status.as_u16() {
            429 => Error::remote("Identity service rate limit exceeded. Please try again later."),
            403 => Error::remote("Identity service denied access."),
            code => Error::remote(format!("Identity service error: HTTP {}", code)),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(&self, response: Response) -> DomainResult<T> {
        response
            .json()
            .await
            .map_err(|e| Error::remote(format!("Malformed identity service response: {}", e)))
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[async_trait]
impl RemoteIdentityStore for HttpIdentityClient {
    async fn create_identity(&self, identity: &NewIdentity) -> DomainResult<IdentityId> {
        let response = self
            .client
            .post(self.endpoint(&["identities"]))
            .json(identity)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(Error::DuplicateIdentity(identity.phone.clone()));
        }
        self.check_response_status(&response)?;

        let created: CreatedIdentity = self.parse(response).await?;
        Ok(created.identity_id)
    }

    async fn get_identity_by_phone(&self, phone: &str) -> DomainResult<Option<RemoteIdentity>> {
        let mut url = self.endpoint(&["identities"]);
        url.query_pairs_mut().append_pair("phone", phone);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.check_response_status(&response)?;
        self.parse(response).await.map(Some)
    }

    async fn verify_device_binding(&self, identity_id: &str, device_id: &str) -> DomainResult<bool> {
        let response = self
            .client
            .post(self.endpoint(&["identities", identity_id, "device-binding"]))
            .json(&DeviceBindingRequest { device_id })
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.check_response_status(&response)?;

        let binding: DeviceBindingResponse = self.parse(response).await?;
        Ok(binding.matches)
    }
}

#[async_trait]
impl OtpProvider for HttpIdentityClient {
    async fn send(&self, phone: &str) -> DomainResult<OtpHandle> {
        let response = self
            .client
            .post(self.endpoint(&["otp", "send"]))
            .json(&OtpSendRequest { phone })
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;
        let sent: OtpSendResponse = self.parse(response).await?;
        Ok(OtpHandle(sent.handle))
    }

    async fn confirm(&self, handle: &OtpHandle, code: &str) -> DomainResult<Option<IdentityToken>> {
        let response = self
            .client
            .post(self.endpoint(&["otp", "confirm"]))
            .json(&OtpConfirmRequest {
                handle: &handle.0,
                code,
            })
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        self.check_response_status(&response)?;
        self.parse(response).await.map(Some)
    }
}

#[async_trait]
impl AccountPinStore for HttpIdentityClient {
    async fn verify_account_pin(&self, account_id: &str, pin: &str) -> DomainResult<bool> {
        let response = self
            .client
            .post(self.endpoint(&["accounts", account_id, "verify-pin"]))
            .json(&VerifyPinRequest { pin })
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.check_response_status(&response)?;

        let verified: VerifyPinResponse = self.parse(response).await?;
        Ok(verified.valid)
    }
}

/// Placeholder used when no identity service is configured
///
/// Local PIN operations keep working; anything that needs the backend
/// fails with a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredRemote;

impl UnconfiguredRemote {
    fn error() -> Error {
        Error::Config(
            "No identity service configured. Set remote.baseUrl or IDWALLET_REMOTE_URL, or enable demo mode."
                .to_string(),
        )
    }
}

#[async_trait]
impl RemoteIdentityStore for UnconfiguredRemote {
    async fn create_identity(&self, _identity: &NewIdentity) -> DomainResult<IdentityId> {
        Err(Self::error())
    }

    async fn get_identity_by_phone(&self, _phone: &str) -> DomainResult<Option<RemoteIdentity>> {
        Err(Self::error())
    }

    async fn verify_device_binding(&self, _identity_id: &str, _device_id: &str) -> DomainResult<bool> {
        Err(Self::error())
    }
}

#[async_trait]
impl OtpProvider for UnconfiguredRemote {
    async fn send(&self, _phone: &str) -> DomainResult<OtpHandle> {
        Err(Self::error())
    }

    async fn confirm(&self, _handle: &OtpHandle, _code: &str) -> DomainResult<Option<IdentityToken>> {
        Err(Self::error())
    }
}

#[async_trait]
impl AccountPinStore for UnconfiguredRemote {
    async fn verify_account_pin(&self, _account_id: &str, _pin: &str) -> DomainResult<bool> {
        Err(Self::error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::remote_mock::{MockConfig, MockIdentityServer, MOCK_OTP_CODE};
    use crate::domain::PinLength;
    use crate::services::hashing;

    fn client(server: &MockIdentityServer) -> HttpIdentityClient {
        HttpIdentityClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    fn new_identity(phone: &str) -> NewIdentity {
        let salt = hashing::generate_salt();
        NewIdentity {
            phone: phone.to_string(),
            pin_hash: hashing::hash_pin("482917", &salt),
            pin_salt: salt,
            pin_length: PinLength::Six,
            device_id: "ab".repeat(32),
        }
    }

    #[test]
    fn test_rejects_plain_http_for_remote_hosts() {
        let err = HttpIdentityClient::new("http://id.example.com", Duration::from_secs(5));
        assert!(err.is_err());

        assert!(HttpIdentityClient::new("https://id.example.com/api/v1", Duration::from_secs(5)).is_ok());
        assert!(HttpIdentityClient::new("http://localhost:8080", Duration::from_secs(5)).is_ok());
        assert!(HttpIdentityClient::new("http://127.0.0.1:8080", Duration::from_secs(5)).is_ok());
        assert!(HttpIdentityClient::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client =
            HttpIdentityClient::new("https://id.example.com/api/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint(&["accounts", "acc 1", "verify-pin"]).as_str(),
            "https://id.example.com/api/v1/accounts/acc%201/verify-pin"
        );
    }

    #[tokio::test]
    async fn test_create_and_fetch_identity() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        let client = client(&server);

        let identity = new_identity("+15550109999");
        let id = client.create_identity(&identity).await.unwrap();

        let fetched = client
            .get_identity_by_phone("+15550109999")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.identity_id, id);
        assert_eq!(fetched.pin_hash, identity.pin_hash);
        assert_eq!(fetched.pin_salt, identity.pin_salt);
        assert_eq!(fetched.pin_length, PinLength::Six);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_conflict() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        let client = client(&server);

        client.create_identity(&new_identity("+15550109999")).await.unwrap();
        let err = client
            .create_identity(&new_identity("+15550109999"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity(_)));
    }

    #[tokio::test]
    async fn test_unknown_phone_is_none() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        assert!(client(&server)
            .get_identity_by_phone("+15550100000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_device_binding() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        let client = client(&server);
        let id = client.create_identity(&new_identity("+15550109999")).await.unwrap();

        assert!(client.verify_device_binding(&id, &"ab".repeat(32)).await.unwrap());
        assert!(!client.verify_device_binding(&id, &"cd".repeat(32)).await.unwrap());
        assert!(!client.verify_device_binding("missing", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_otp_flow() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        let client = client(&server);

        let handle = client.send("+15550109999").await.unwrap();
        assert!(client.confirm(&handle, "000000").await.unwrap().is_none());
        let token = client.confirm(&handle, MOCK_OTP_CODE).await.unwrap().unwrap();
        assert!(!token.token.is_empty());
    }

    #[tokio::test]
    async fn test_account_pin() {
        let server = MockIdentityServer::start(MockConfig::default()).unwrap();
        server.set_account_pin("acc-1", "2580");
        let client = client(&server);

        assert!(client.verify_account_pin("acc-1", "2580").await.unwrap());
        assert!(!client.verify_account_pin("acc-1", "9137").await.unwrap());
        assert!(!client.verify_account_pin("acc-2", "2580").await.unwrap());
    }

    #[tokio::test]
    async fn test_server_error_is_remote_error() {
        let server = MockIdentityServer::start(MockConfig {
            fail_status: Some(503),
            ..Default::default()
        })
        .unwrap();

        let err = client(&server)
            .get_identity_by_phone("+15550109999")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_unconfigured_remote_is_config_error() {
        assert!(matches!(
            UnconfiguredRemote.send("+15550109999").await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_remote_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            HttpIdentityClient::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            client.send("+15550109999").await,
            Err(Error::Remote(_))
        ));
    }
}
