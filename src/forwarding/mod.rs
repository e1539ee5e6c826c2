//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved route + inbound request
//!     → forwarder.rs (welcome short-circuit, breaker check, service lookup)
//!     → request.rs (target URL, header copy, body buffering)
//!     → client.rs (outbound call under connect/read timeouts)
//!     → response.rs (gzip unwrap, relay)
//!     → forwarder.rs (record outcome in the breaker)
//! ```
//!
//! # Design Decisions
//! - Each call is independent; the only shared state touched is the
//!   breaker's per-service entry
//! - No retries
//! - If the inbound connection closes, the handler future is dropped and
//!   the in-flight outbound call with it; no outcome is recorded, so a
//!   half-open probe cancelled this way is released by its lease expiry

pub mod client;
pub mod forwarder;
pub mod request;
pub mod response;

pub use client::UpstreamClient;
pub use forwarder::RequestForwarder;
pub use response::{OutboundResponse, WELCOME_MESSAGE};
