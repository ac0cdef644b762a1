//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → security (CORS, rate limit)
//!     → upload.rs (run the relay pipeline)
//!     → response (JSON body, security headers, request ID)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod status;
pub mod upload;

pub use request::X_REQUEST_ID;
pub use server::{AppState, RelayServer, ServerError, HEALTH_PATH, UPLOAD_PATH};
