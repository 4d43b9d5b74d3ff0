//! Gas top-up subsystem.
//!
//! # Data Flow
//! ```text
//! request_topup(address)
//!     → connection on the target chain? else UnsupportedNetwork
//!     → treasury.rs: treasury balance ≥ amount? → signed value transfer → receipt
//!     → on any failure: endpoints.rs (POST {address} to each faucet, first 2xx wins)
//!     → all failed: TopupOutcome::Manual { url }
//! ```
//!
//! # Security Constraints
//! - The treasury key is read from the environment only, never from config
//! - The key is never logged; `TreasuryWallet`'s Debug hides it

pub mod endpoints;
pub mod treasury;
pub mod types;

pub use endpoints::FaucetEndpoints;
pub use treasury::TreasuryFaucet;
pub use types::{BalanceLevel, TokenFaucetResult, TopupOutcome, TopupStatus, TreasuryInfo};
