//! Request processing pipeline.
//!
//! # Data Flow
//! ```text
//! POST /process (JSON array of strings)
//!     → orchestrator.rs (root span, traceparent extraction, metrics)
//!     → chaos (latency, then simulated error)
//!     → chain.rs (0..N sequential hops, child span each)
//!     → Vec<String> or error.rs (ProcessError → status + {"error": ...})
//! ```

pub mod chain;
pub mod error;
pub mod orchestrator;

pub use chain::{PropagationChain, HOP_TIMEOUT};
pub use error::ProcessError;
pub use orchestrator::{RequestOrchestrator, ACTIVE_REQUESTS_SENTINEL, PROCESS_ENDPOINT};
