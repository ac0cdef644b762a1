//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer preflights, enforce origin allow-list)
//!     → rate_limit.rs (check per-IP sliding window)
//!     → upload handler
//! Outgoing response:
//!     → headers.rs (add hardening headers)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Preflights are answered before the limiter counts anything
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::cors_layer;
pub use headers::with_security_headers;
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
