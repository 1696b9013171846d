//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Encrypted DuckDB file for the SecureStore port
//! - Process-local map for the SecureStore port (tests, web fallback)
//! - HTTP client for the identity service, OTP and account PIN ports
//! - Offline demo backend for the same ports
//! - Platform device id, biometric and clock sources

pub mod demo;
pub mod duckdb;
pub mod memory;
pub mod platform;
pub mod remote;

#[cfg(test)]
pub mod remote_mock;
