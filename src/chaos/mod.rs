//! Fault injection subsystem.
//!
//! # Data Flow
//! ```text
//! FaultConfig (startup, immutable)
//!     → injector.rs
//!         → maybe_delay: sleep the current request for [0, max_latency_ms]
//!         → should_fail: roll [1, 100] against error_percent
//! ```
//!
//! # Design Decisions
//! - Delays use `tokio::time::sleep`, so only the injecting request waits
//! - Random draws are plain functions over `rand::Rng` and testable with a seeded RNG
//! - The injector records nothing itself; callers own spans and logs

pub mod injector;

pub use injector::{draw_delay, draw_failure, FaultInjector};
