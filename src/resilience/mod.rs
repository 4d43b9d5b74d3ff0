//! Resilience helpers.
//!
//! # Design Decisions
//! - Every external call has a deadline (see `blockchain::connection`)
//! - Polling loops back off exponentially with jitter after failures

pub mod backoff;
