//! User-facing Rust SDK for the Worklane freelancing platform.
//!
//! The crate is organized by transport surface:
//! - `api`: generic JSON REST client for business entities.
//! - `auth`: token sourcing for authenticated connections.
//! - `realtime`: websocket transport, event fan-out, and reconnect handling.
//! - `retry`: shared retry and timeout utilities.

/// REST client and error types.
pub mod api;
/// Token providers consumed at connect time.
pub mod auth;
/// Realtime client, wire protocol, and session helpers.
pub mod realtime;
/// Retry and timeout helpers used by the REST surface.
pub mod retry;
