//! Mock identity service for testing
//!
//! A small HTTP server on a random local port that keeps identities, OTP
//! handles and account PINs in memory and answers the same routes as the
//! real identity service:
//! - POST /identities returns { identityId } or 409 for a known phone
//! - GET /identities?phone= returns the identity or 404
//! - POST /identities/{id}/device-binding returns { matches }
//! - POST /otp/send returns { handle }; POST /otp/confirm returns a token or 401
//! - POST /accounts/{id}/verify-pin returns { valid } or 404

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};
use url::Url;
use uuid::Uuid;

use crate::domain::RemoteIdentity;
use crate::services::hashing;

/// Code accepted by the mock OTP endpoint
pub const MOCK_OTP_CODE: &str = "135790";

/// Mock behaviour switches
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every request with this status
    pub fail_status: Option<u16>,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

#[derive(Debug, Default)]
struct MockState {
    identities: HashMap<String, RemoteIdentity>,
    otp_handles: HashMap<String, String>,
    /// account id -> (salt, hash)
    account_pins: HashMap<String, (String, String)>,
}

/// Mock identity server
pub struct MockIdentityServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockIdentityServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState::default()));

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Register a payment PIN for an account
    pub fn set_account_pin(&self, account_id: &str, pin: &str) {
        let salt = hashing::generate_salt();
        let hash = hashing::hash_pin(pin, &salt);
        self.state
            .lock()
            .unwrap()
            .account_pins
            .insert(account_id.to_string(), (salt, hash));
    }

    pub fn identity_count(&self) -> usize {
        self.state.lock().unwrap().identities.len()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockIdentityServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one request: headers, then `Content-Length` bytes of body
fn read_request(stream: &mut TcpStream) -> Option<(String, String, String)> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    let body = String::from_utf8_lossy(&data[header_end..]).to_string();
    Some((method, target, body))
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    let Some((method, target, body)) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    if let Some(status) = config.fail_status {
        send_json(&mut stream, status, &json!({ "error": "Simulated failure" }));
        return;
    }

    let Ok(url) = Url::parse(&format!("http://mock{}", target)) else {
        send_json(&mut stream, 400, &json!({ "error": "Invalid request" }));
        return;
    };
    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.map(|p| p.to_string()).collect())
        .unwrap_or_default();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let body: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
    let mut state = state.lock().unwrap();

    let (status, response) = match (method.as_str(), segments.as_slice()) {
        ("POST", ["identities"]) => {
            let mut record = body.clone();
            if let Some(fields) = record.as_object_mut() {
                fields.insert("identityId".into(), json!(Uuid::new_v4().to_string()));
            }
            match serde_json::from_value::<RemoteIdentity>(record) {
                Ok(identity) if state.identities.contains_key(&identity.phone) => {
                    (409, json!({ "error": "Phone already registered" }))
                }
                Ok(identity) => {
                    let id = identity.identity_id.clone();
                    state.identities.insert(identity.phone.clone(), identity);
                    (201, json!({ "identityId": id }))
                }
                Err(_) => (400, json!({ "error": "Invalid identity" })),
            }
        }
        ("GET", ["identities"]) => {
            let phone = url
                .query_pairs()
                .find(|(k, _)| k == "phone")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            match state.identities.get(&phone) {
                Some(identity) => (200, json!(identity)),
                None => (404, json!({ "error": "Not found" })),
            }
        }
        ("POST", ["identities", id, "device-binding"]) => {
            let device_id = body["deviceId"].as_str().unwrap_or_default();
            match state.identities.values().find(|i| i.identity_id == *id) {
                Some(identity) => (200, json!({ "matches": identity.device_id == device_id })),
                None => (404, json!({ "error": "Not found" })),
            }
        }
        ("POST", ["otp", "send"]) => {
            let handle = Uuid::new_v4().to_string();
            let phone = body["phone"].as_str().unwrap_or_default().to_string();
            state.otp_handles.insert(handle.clone(), phone);
            (200, json!({ "handle": handle }))
        }
        ("POST", ["otp", "confirm"]) => {
            let handle = body["handle"].as_str().unwrap_or_default();
            let code = body["code"].as_str().unwrap_or_default();
            match state.otp_handles.get(handle).cloned() {
                Some(phone) if code == MOCK_OTP_CODE => {
                    state.otp_handles.remove(handle);
                    let identity_id = state
                        .identities
                        .get(&phone)
                        .map(|i| i.identity_id.clone())
                        .unwrap_or_default();
                    (
                        200,
                        json!({ "identityId": identity_id, "token": Uuid::new_v4().to_string() }),
                    )
                }
                _ => (401, json!({ "error": "Invalid code" })),
            }
        }
        ("POST", ["accounts", id, "verify-pin"]) => {
            let pin = body["pin"].as_str().unwrap_or_default();
            match state.account_pins.get(*id) {
                Some((salt, hash)) => (200, json!({ "valid": hashing::matches(pin, salt, hash) })),
                None => (404, json!({ "error": "Not found" })),
            }
        }
        _ => (404, json!({ "error": "Endpoint not found" })),
    };

    drop(state);
    send_json(&mut stream, status, &response);
}

fn send_json(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let body = body.to_string();
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
