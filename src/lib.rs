//! Testnet wallet library.
//!
//! Wallet session, single-network enforcement, ERC-20 transfers with gas
//! estimation, and an automated treasury/faucet gas top-up for one test
//! network.

pub mod app;
pub mod balances;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod faucet;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod session;
pub mod transfer;

pub use app::WalletApp;
pub use config::schema::WalletConfig;
pub use error::{ErrorKind, WalletError, WalletResult};
pub use lifecycle::Shutdown;
pub use session::WalletSession;
pub use transfer::TransferOrchestrator;
