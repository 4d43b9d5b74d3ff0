//! Automated gas top-up.
//!
//! # Responsibilities
//! - Refuse top-ups when the connection is not on the target chain
//! - Send a fixed native amount from the treasury wallet
//! - Fall back to third-party faucets, then to the manual faucet page
//! - Track the cooldown between successful requests
//! - Expose the `Idle → Requesting → Done | Error` lifecycle
//!
//! # Design Decisions
//! - The cooldown is one global timestamp, not per address, and lives only
//!   in memory; a restart forgets it
//! - `request_topup` does not enforce the cooldown; callers check
//!   `can_request` first
//! - One top-up and one token request may be in flight at a time; a
//!   concurrent call fails with `FaucetBusy` and leaves the status alone
//! - A treasury failure of any kind is expected and only logged; the flow
//!   continues with the HTTP faucets
//! - Terminal states return to `Idle` after the reset window

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::blockchain::connection::Connection;
use crate::blockchain::types::{ChainId, ReceiptOutcome};
use crate::blockchain::wallet::TreasuryWallet;
use crate::config::FaucetConfig;
use crate::error::{RequestError, WalletError, WalletResult};
use crate::faucet::endpoints::FaucetEndpoints;
use crate::faucet::types::{TokenFaucetResult, TopupOutcome, TopupStatus, TreasuryInfo};
use crate::observability::metrics;

pub struct TreasuryFaucet {
    config: FaucetConfig,
    amount: U256,
    cooldown: Duration,
    target: ChainId,
    treasury: Option<TreasuryWallet>,
    endpoints: FaucetEndpoints,
    last_request_at: Mutex<Option<Instant>>,
    reset_after: Duration,
    status: Arc<watch::Sender<TopupStatus>>,
    /// Bumped by every top-up and reset; stale auto-resets compare it.
    generation: Arc<AtomicU64>,
    requesting: AtomicBool,
    requesting_tokens: AtomicBool,
}

/// Holds an in-flight flag and clears it however the request ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TreasuryFaucet {
    /// Faucet with an explicit treasury (or none). Top-ups only run on a
    /// connection to `target`.
    pub fn new(
        config: FaucetConfig,
        treasury: Option<TreasuryWallet>,
        target: ChainId,
    ) -> WalletResult<Self> {
        let amount = parse_ether(&config.amount).map_err(|_| RequestError::Amount)?;
        let (status, _) = watch::channel(TopupStatus::Idle);
        Ok(Self {
            amount,
            cooldown: Duration::from_secs(config.cooldown_secs),
            reset_after: Duration::from_secs(config.reset_after_secs),
            target,
            endpoints: FaucetEndpoints::new(&config),
            treasury,
            config,
            last_request_at: Mutex::new(None),
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
            requesting: AtomicBool::new(false),
            requesting_tokens: AtomicBool::new(false),
        })
    }

    /// Faucet whose treasury key comes from `faucet.treasury_key_env`.
    /// A missing or malformed key leaves the treasury disabled.
    pub fn from_env(config: FaucetConfig, target: ChainId) -> WalletResult<Self> {
        let treasury = match TreasuryWallet::from_env(&config.treasury_key_env) {
            Ok(wallet) => {
                tracing::info!(treasury = %wallet.address(), "Treasury wallet loaded");
                Some(wallet)
            }
            Err(fault) => {
                tracing::info!(
                    var = %config.treasury_key_env,
                    reason = %fault.message,
                    "Treasury disabled, top-ups use HTTP faucets only"
                );
                None
            }
        };
        Self::new(config, treasury, target)
    }

    pub fn treasury_address(&self) -> Option<Address> {
        self.treasury.as_ref().map(TreasuryWallet::address)
    }

    /// Top-up amount in wei.
    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn status(&self) -> TopupStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TopupStatus> {
        self.status.subscribe()
    }

    pub fn is_requesting(&self) -> bool {
        self.requesting.load(Ordering::Acquire)
    }

    pub fn is_requesting_tokens(&self) -> bool {
        self.requesting_tokens.load(Ordering::Acquire)
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        *self
            .last_request_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// True before any request, and again once the cooldown has elapsed.
    pub fn can_request(&self) -> bool {
        match self.last_request_at() {
            None => true,
            Some(at) => at.elapsed() >= self.cooldown,
        }
    }

    fn mark_requested(&self) {
        *self
            .last_request_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Fund `address`: treasury first, then HTTP faucets, then the manual
    /// page. Fails only when the connection is on another chain, or
    /// another top-up is still running.
    pub async fn request_topup(
        &self,
        address: Address,
        connection: &dyn Connection,
    ) -> WalletResult<TopupOutcome> {
        let Some(_flag) = InFlight::acquire(&self.requesting) else {
            tracing::warn!(address = %address, "Top-up requested while another is in flight");
            return Err(WalletError::FaucetBusy);
        };
        if !self.can_request() {
            tracing::debug!(address = %address, "Top-up requested during cooldown");
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.status.send_replace(TopupStatus::Requesting);

        let result = self.topup(address, connection).await;

        let status = match &result {
            Ok(outcome) => TopupStatus::Done {
                outcome: outcome.clone(),
            },
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind().as_str(), "Top-up refused");
                TopupStatus::Error { error: err.clone() }
            }
        };
        if self.generation.load(Ordering::Acquire) == generation {
            self.status.send_replace(status);
            self.schedule_reset(generation);
        }
        result
    }

    async fn topup(
        &self,
        address: Address,
        connection: &dyn Connection,
    ) -> WalletResult<TopupOutcome> {
        let chain_id = connection.chain_id().await?;
        if chain_id != self.target {
            return Err(WalletError::UnsupportedNetwork {
                expected: self.target.0,
                actual: chain_id.0,
            });
        }

        match self.treasury_transfer(address, connection).await {
            Ok((hash, treasury)) => {
                self.mark_requested();
                metrics::record_topup("treasury");
                return Ok(TopupOutcome::Treasury {
                    hash,
                    amount: format!("{} ETH", self.config.amount),
                    treasury,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "Treasury transfer failed, trying HTTP faucets");
            }
        }

        if let Some(name) = self.endpoints.request_native(address).await {
            self.mark_requested();
            metrics::record_topup("faucet");
            return Ok(TopupOutcome::Faucet { name });
        }

        let url = self.config.manual_url_for(&address.to_string());
        tracing::info!(url = %url, "All faucets failed, manual faucet required");
        metrics::record_topup("manual");
        Ok(TopupOutcome::Manual { url })
    }

    fn schedule_reset(&self, generation: u64) {
        let status = Arc::downgrade(&self.status);
        let current = Arc::clone(&self.generation);
        let delay = self.reset_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(status) = status.upgrade() else {
                return;
            };
            if current.load(Ordering::Acquire) == generation {
                status.send_replace(TopupStatus::Idle);
                tracing::debug!("Top-up status reset to idle");
            }
        });
    }

    /// Return to `Idle` immediately.
    pub fn reset_status(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.status.send_replace(TopupStatus::Idle);
    }

    async fn treasury_transfer(
        &self,
        to: Address,
        connection: &dyn Connection,
    ) -> WalletResult<(TxHash, Address)> {
        let treasury = self
            .treasury
            .as_ref()
            .ok_or_else(|| WalletError::Unknown("Treasury key not configured".to_string()))?;
        let from = treasury.address();

        let balance = connection.native_balance(from).await?;
        if balance < self.amount {
            return Err(WalletError::TreasuryInsufficientFunds {
                available: format_ether(balance),
            });
        }

        let signing = connection.with_signer(treasury.signer())?;
        let gas_price = signing.gas_price().await?;
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(self.amount)
            .with_gas_limit(self.config.gas_limit)
            .with_gas_price(gas_price);

        let hash = signing.send_transaction(tx).await?;
        tracing::info!(tx_hash = %hash, to = %to, "Treasury transaction sent");

        match signing.wait_for_receipt(hash).await? {
            ReceiptOutcome::Success { hash, .. } => Ok((hash, from)),
            ReceiptOutcome::Reverted { .. } => {
                Err(WalletError::Unknown("Treasury transaction failed".to_string()))
            }
        }
    }

    /// Treasury balance and whether it can fund a top-up. Any failure
    /// reads as an empty, unavailable treasury.
    pub async fn treasury_info(&self, connection: &dyn Connection) -> TreasuryInfo {
        let Some(treasury) = &self.treasury else {
            return TreasuryInfo::unavailable();
        };
        match connection.native_balance(treasury.address()).await {
            Ok(balance) => TreasuryInfo {
                balance: format_ether(balance),
                available: balance > self.amount,
            },
            Err(fault) => {
                tracing::debug!(error = %fault, "Treasury balance unavailable");
                TreasuryInfo::unavailable()
            }
        }
    }

    /// Ask every configured token faucet for test tokens.
    pub async fn request_test_tokens(
        &self,
        address: Address,
    ) -> WalletResult<Vec<TokenFaucetResult>> {
        let Some(_flag) = InFlight::acquire(&self.requesting_tokens) else {
            tracing::warn!(address = %address, "Token request while another is in flight");
            return Err(WalletError::FaucetBusy);
        };
        let mut results = Vec::with_capacity(self.endpoints.token_faucets().len());
        for faucet in self.endpoints.token_faucets() {
            results.push(self.endpoints.request_token(faucet, address).await);
        }
        self.mark_requested();
        Ok(results)
    }
}

impl std::fmt::Debug for TreasuryFaucet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreasuryFaucet")
            .field("amount", &self.config.amount)
            .field("treasury", &self.treasury_address())
            .field("cooldown_secs", &self.cooldown.as_secs())
            .field("target", &self.target)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEPOLIA: ChainId = ChainId(11_155_111);

    #[test]
    fn test_invalid_amount_rejected() {
        let config = FaucetConfig {
            amount: "lots".to_string(),
            ..FaucetConfig::default()
        };
        let err = TreasuryFaucet::new(config, None, SEPOLIA).unwrap_err();
        assert_eq!(err, WalletError::InvalidRequest(RequestError::Amount));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_window() {
        let faucet = TreasuryFaucet::new(FaucetConfig::default(), None, SEPOLIA).unwrap();
        assert!(faucet.can_request());

        faucet.mark_requested();
        assert!(!faucet.can_request());

        tokio::time::advance(Duration::from_secs(23 * 60 * 60)).await;
        assert!(!faucet.can_request());

        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        assert!(faucet.can_request());
    }

    #[test]
    fn test_amount_parsed_in_wei() {
        let faucet = TreasuryFaucet::new(FaucetConfig::default(), None, SEPOLIA).unwrap();
        assert_eq!(faucet.amount(), U256::from(100_000_000_000_000_000u128));
        assert!(faucet.treasury_address().is_none());
    }

    #[test]
    fn test_in_flight_flag_released_on_drop() {
        let flag = AtomicBool::new(false);
        let held = InFlight::acquire(&flag);
        assert!(held.is_some());
        assert!(InFlight::acquire(&flag).is_none());

        drop(held);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
