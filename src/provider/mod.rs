//! Injected wallet (EIP-1193) subsystem.
//!
//! # Data Flow
//! ```text
//! WalletSession / NetworkGuard
//!     → WalletProvider trait (accounts, chain id, switch/add chain)
//!     → http.rs (JSON-RPC to the wallet's local endpoint)
//!
//! Wallet state changes:
//!     http.rs poller detects account/chain change
//!     → broadcast WalletEvent
//!     → WalletSession listener (one transition per event)
//! ```

pub mod http;

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::blockchain::connection::Connection;
use crate::blockchain::types::{ChainId, ProviderResult};
use crate::config::{NativeCurrency, NetworkConfig};

pub use http::HttpWallet;

/// Notification emitted by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The authorized account set changed; empty means locked/disconnected.
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// Chain descriptor sent with `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// `0x`-hex chain id.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl From<&NetworkConfig> for ChainDescriptor {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            chain_id: ChainId(network.chain_id).to_hex(),
            chain_name: network.name.clone(),
            native_currency: network.native_currency.clone(),
            rpc_urls: network.rpc_urls.clone(),
            block_explorer_urls: vec![network.explorer_url.clone()],
        }
    }
}

/// The browser-style wallet surface the session depends on.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Prompt the user for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Already-authorized accounts, without prompting (`eth_accounts`).
    async fn accounts(&self) -> ProviderResult<Vec<Address>>;

    async fn chain_id(&self) -> ProviderResult<ChainId>;

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()>;

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> ProviderResult<()>;

    /// Subscribe to account and chain notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;

    /// Signing connection for an authorized account.
    fn connection(&self, account: Address) -> ProviderResult<Arc<dyn Connection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_descriptor_wire_format() {
        let descriptor = ChainDescriptor::from(&NetworkConfig::default());
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["chainId"], "0xaa36a7");
        assert_eq!(json["chainName"], "Sepolia Testnet");
        assert_eq!(json["nativeCurrency"]["symbol"], "ETH");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["blockExplorerUrls"][0], "https://sepolia.etherscan.io");
        assert_eq!(json["rpcUrls"].as_array().unwrap().len(), 3);
    }
}
