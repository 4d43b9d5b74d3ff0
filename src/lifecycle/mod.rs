//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl-C or dispose → broadcast () → background tasks exit their loops
//! ```
//!
//! Background tasks (wallet poller, session listener, balance refresher)
//! each hold a receiver and stop at their next await point.

pub mod shutdown;

pub use shutdown::Shutdown;
