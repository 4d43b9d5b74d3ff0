//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Wallet connection (signing) ─┐
//!                              ├→ resolver.rs (pick user connection or cached fallback)
//! Public RPC endpoints ────────┘     → connection.rs (RPC with timeouts, receipts)
//!                                    → erc20.rs (token calls via sol! ABI)
//! Environment (treasury key)
//!     → wallet.rs (local signer bound to a connection)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Legacy (non EIP-1559) gas pricing for every write

pub mod connection;
pub mod erc20;
pub mod resolver;
pub mod tokens;
pub mod types;
pub mod wallet;

pub use connection::{Connection, RpcConnection, RpcTimings};
pub use erc20::Erc20;
pub use resolver::ProviderResolver;
pub use tokens::{TokenDescriptor, TokenRegistry};
pub use types::{ChainId, GasEstimate, ProviderFault, ProviderResult, ReceiptOutcome};
pub use wallet::TreasuryWallet;
