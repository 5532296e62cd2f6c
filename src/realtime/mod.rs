//! Realtime messaging modules.
//!
//! - `client`: websocket transport, subscriber fan-out, and reconnect
//!   handling.
//! - `proto`: envelope format and typed event payloads.
//! - `session`: typed event stream with presence and typing state.

/// Websocket connection and subscriber registry.
pub mod client;
/// Wire envelopes and event payloads.
pub mod proto;
/// Session wrapper that tracks presence and emits typed events.
pub mod session;
