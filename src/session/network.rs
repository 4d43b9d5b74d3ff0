//! Single-network enforcement.
//!
//! # Responsibilities
//! - Track the chain the wallet reports and whether it is the target
//! - Drive `wallet_switchEthereumChain`, adding the chain when the wallet
//!   does not know it (code 4902)
//! - Allow at most one switch request in flight
//!
//! # Design Decisions
//! - The in-flight flag rejects a concurrent switch with `SwitchInProgress`
//!   rather than queueing it; the wallet shows one prompt at a time
//! - After a successful switch or add the chain is re-read, so the
//!   published state always comes from the wallet

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::blockchain::types::ChainId;
use crate::config::NetworkConfig;
use crate::error::{WalletError, WalletResult, UNRECOGNIZED_CHAIN_CODE};
use crate::provider::{ChainDescriptor, WalletProvider};
use crate::session::state::NetworkState;

/// Compares the wallet's chain against the one supported network.
pub struct NetworkGuard {
    wallet: Arc<dyn WalletProvider>,
    target: ChainId,
    descriptor: ChainDescriptor,
    state: watch::Sender<Option<NetworkState>>,
    switching: AtomicBool,
}

/// Clears the in-flight flag however the switch ends.
struct SwitchFlag<'a>(&'a AtomicBool);

impl Drop for SwitchFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NetworkGuard {
    pub fn new(wallet: Arc<dyn WalletProvider>, network: &NetworkConfig) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            wallet,
            target: ChainId(network.chain_id),
            descriptor: ChainDescriptor::from(network),
            state,
            switching: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> ChainId {
        self.target
    }

    /// Last observed network, `None` before the first check.
    pub fn network(&self) -> Option<NetworkState> {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<NetworkState>> {
        self.state.subscribe()
    }

    /// True only once a chain other than the target has been observed.
    pub fn is_wrong_network(&self) -> bool {
        matches!(self.network(), Some(network) if !network.is_supported)
    }

    pub fn is_switching(&self) -> bool {
        self.switching.load(Ordering::Acquire)
    }

    /// Query the wallet's chain and publish the result.
    pub async fn check_network(&self) -> WalletResult<NetworkState> {
        let chain_id = self.wallet.chain_id().await?;
        Ok(self.observe_chain(chain_id))
    }

    /// Record a chain id reported by a wallet notification.
    pub fn observe_chain(&self, chain_id: ChainId) -> NetworkState {
        let network = NetworkState {
            chain_id,
            is_supported: chain_id == self.target,
        };
        let previous = self.state.send_replace(Some(network));
        if previous != Some(network) {
            tracing::info!(
                chain_id = %chain_id,
                expected = %self.target,
                supported = network.is_supported,
                "Wallet network observed"
            );
        }
        network
    }

    /// Fail with `UnsupportedNetwork` unless the wallet is on the target
    /// chain. Checks the wallet when nothing has been observed yet.
    pub async fn require_supported(&self) -> WalletResult<()> {
        let network = match self.network() {
            Some(network) => network,
            None => self.check_network().await?,
        };
        if network.is_supported {
            Ok(())
        } else {
            Err(WalletError::UnsupportedNetwork {
                expected: self.target.0,
                actual: network.chain_id.0,
            })
        }
    }

    /// Ask the wallet to move to the target chain.
    pub async fn switch_network(&self) -> WalletResult<NetworkState> {
        if self
            .switching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Network switch requested while another is in flight");
            return Err(WalletError::SwitchInProgress);
        }
        let _flag = SwitchFlag(&self.switching);

        tracing::info!(expected = %self.target, "Requesting network switch");
        match self.wallet.switch_chain(self.target).await {
            Ok(()) => {}
            Err(fault) if fault.code == Some(UNRECOGNIZED_CHAIN_CODE) => {
                tracing::info!(
                    chain = %self.descriptor.chain_name,
                    "Wallet does not know the target chain, adding it"
                );
                self.wallet.add_chain(&self.descriptor).await?;
            }
            Err(fault) => return Err(fault.into()),
        }

        self.check_network().await
    }
}

impl std::fmt::Debug for NetworkGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkGuard")
            .field("target", &self.target)
            .field("network", &self.network())
            .field("switching", &self.is_switching())
            .finish()
    }
}
