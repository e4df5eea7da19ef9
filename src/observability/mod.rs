//! Observability: structured logging via `tracing-subscriber`.
//!
//! Library code only emits `tracing` events. Installing a subscriber is left
//! to the binary.

mod tracing_init;

pub use tracing_init::*;
