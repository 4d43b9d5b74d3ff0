//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Session, transfers, faucet, normalization:
//!     → logging.rs (structured tracing events, EnvFilter-controlled)
//!     → metrics.rs (counters through the `metrics` facade)
//!     → optional Prometheus listener installed by the binary
//! ```
//!
//! Never log private keys.

pub mod logging;
pub mod metrics;
