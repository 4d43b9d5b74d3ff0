//! Wallet session subsystem.
//!
//! # Data Flow
//! ```text
//! connect() ──→ request accounts → check chain → (switch/add chain) → Connected
//! init()    ──→ probe eth_accounts + chain → silently Connected, or stay Disconnected
//!
//! WalletEvent::AccountsChanged → Connected(new address) | Disconnected(error?)
//! WalletEvent::ChainChanged    → invalidate → Disconnected → probe again
//! ```
//!
//! Consumers read `Session` snapshots or subscribe to the watch channel;
//! only `WalletSession` mutates them.

pub mod network;
pub mod state;
pub mod wallet_session;

pub use network::NetworkGuard;
pub use state::{ConnectionState, NetworkState, Session, Transition};
pub use wallet_session::WalletSession;
