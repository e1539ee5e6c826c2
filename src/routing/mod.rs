//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, method)
//!     → router.rs (ordered scan of the route registry snapshot)
//!     → matcher.rs (glob pattern evaluation)
//!     → Return: matched RouteDefinition or RouteNotFound
//!
//! Route compilation (at load):
//!     RouteRecord[]
//!     → compile PathPattern per record
//!     → install as one immutable list
//! ```
//!
//! # Design Decisions
//! - Deterministic: same input always matches same route
//! - First match wins, in configuration order

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::RequestRouter;
