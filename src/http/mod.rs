//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → routing (route lookup)
//!     → forwarding (backend call, gzip unwrap)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_id, GatewayRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
