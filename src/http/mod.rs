//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign and echo x-request-id)
//!     → handlers.rs
//!         GET /         → identity message + metrics
//!         GET /metrics  → Prometheus exposition
//!         POST /process → pipeline::RequestOrchestrator
//!     → JSON response or {"error": ...}
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
