//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs (is the service available?)
//!     → forwarder performs the call under the client's timeouts
//!     → circuit_breaker.rs (record success or transport failure)
//! ```
//!
//! # Design Decisions
//! - Reachability drives the breaker: any completed exchange is a success,
//!   whatever its status code
//! - No retries; one failed attempt is one failure
//! - Time comes from an injectable clock so transitions are deterministic

pub mod circuit_breaker;
pub mod clock;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, State};
pub use clock::{Clock, ManualClock, SystemClock};
