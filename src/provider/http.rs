//! EIP-1193 wallet reached over HTTP JSON-RPC.
//!
//! # Responsibilities
//! - Forward account, chain and network-switch requests to the wallet
//! - Preserve the wallet's error code and message untouched
//! - Poll for account/chain changes and publish them as events
//!
//! # Design Decisions
//! - HTTP cannot push notifications, so changes are detected by polling
//! - The first poll only records a baseline; no event is emitted for it
//! - Requests go through alloy's JSON-RPC client, the same one
//!   `RpcConnection` uses
//! - Repeated poll failures back off exponentially with jitter

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::json_rpc::{RpcRecv, RpcSend};
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use crate::blockchain::connection::{Connection, RpcConnection, RpcTimings};
use crate::blockchain::types::{ChainId, ProviderFault, ProviderResult};
use crate::config::WalletProviderConfig;
use crate::provider::{ChainDescriptor, WalletEvent, WalletProvider};
use crate::resilience::backoff::calculate_backoff;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Wallet exposing EIP-1193 methods on a local JSON-RPC endpoint.
pub struct HttpWallet {
    url: url::Url,
    provider: RootProvider<Ethereum>,
    timings: RpcTimings,
    events: broadcast::Sender<WalletEvent>,
    poll_interval: Duration,
    max_backoff: Duration,
}

/// Last observed wallet state, used to derive change events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub accounts: Vec<Address>,
    pub chain_id: ChainId,
}

/// Events implied by moving from `prev` to `next`. Chain changes come first.
pub fn diff_snapshots(prev: Option<&WalletSnapshot>, next: &WalletSnapshot) -> Vec<WalletEvent> {
    let Some(prev) = prev else {
        return Vec::new();
    };

    let mut events = Vec::new();
    if prev.chain_id != next.chain_id {
        events.push(WalletEvent::ChainChanged(next.chain_id));
    }
    if prev.accounts != next.accounts {
        events.push(WalletEvent::AccountsChanged(next.accounts.clone()));
    }
    events
}

/// Wallet error responses keep their code; an unreachable wallet reads as
/// a network failure.
fn wallet_fault(err: TransportError) -> ProviderFault {
    if err.as_error_resp().is_some() {
        return ProviderFault::from(err);
    }
    match err {
        RpcError::Transport(kind) => {
            ProviderFault::message(format!("network error contacting wallet: {}", kind))
        }
        other => ProviderFault::message(format!("malformed wallet response: {}", other)),
    }
}

impl HttpWallet {
    pub fn new(
        url: &str,
        config: &WalletProviderConfig,
        timings: RpcTimings,
    ) -> ProviderResult<Self> {
        let url: url::Url = url
            .parse()
            .map_err(|e| ProviderFault::message(format!("Invalid wallet URL '{}': {}", url, e)))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            provider: RootProvider::new_http(url.clone()),
            url,
            timings,
            events,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_backoff: Duration::from_millis(config.max_poll_backoff_ms),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn request<P, R>(&self, method: &'static str, params: P) -> ProviderResult<R>
    where
        P: RpcSend,
        R: RpcRecv,
    {
        let call = self.provider.raw_request(Cow::Borrowed(method), params);
        match timeout(self.timings.request_timeout, call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => {
                let fault = wallet_fault(err);
                tracing::debug!(
                    method,
                    code = ?fault.code,
                    message = %fault.message,
                    "Wallet returned error"
                );
                Err(fault)
            }
            Err(_) => Err(ProviderFault::timeout(self.timings.request_timeout.as_secs())),
        }
    }

    async fn snapshot(&self) -> ProviderResult<WalletSnapshot> {
        Ok(WalletSnapshot {
            accounts: self.accounts().await?,
            chain_id: self.chain_id().await?,
        })
    }

    /// Poll the wallet for changes until shutdown.
    pub async fn watch_events(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            url = %self.url,
            interval_ms = self.poll_interval.as_millis() as u64,
            "Wallet event poller starting"
        );

        let mut last: Option<WalletSnapshot> = None;
        let mut failures: u32 = 0;

        loop {
            let delay = if failures == 0 {
                self.poll_interval
            } else {
                calculate_backoff(
                    failures,
                    self.poll_interval.as_millis() as u64,
                    self.max_backoff.as_millis() as u64,
                )
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Wallet event poller received shutdown signal, exiting loop");
                    break;
                }
            }

            match self.snapshot().await {
                Ok(next) => {
                    failures = 0;
                    for event in diff_snapshots(last.as_ref(), &next) {
                        tracing::debug!(event = ?event, "Wallet state changed");
                        // No subscribers is fine; the event is simply dropped.
                        let _ = self.events.send(event);
                    }
                    last = Some(next);
                }
                Err(fault) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(error = %fault, failures, "Wallet poll failed");
                }
            }
        }
    }
}

#[async_trait]
impl WalletProvider for HttpWallet {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        ChainId::parse(&raw)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()> {
        let _: Value = self
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain_id.to_hex() }]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> ProviderResult<()> {
        let _: Value = self
            .request("wallet_addEthereumChain", json!([descriptor]))
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    fn connection(&self, account: Address) -> ProviderResult<Arc<dyn Connection>> {
        let connection = RpcConnection::for_account(self.url.as_str(), account, self.timings)?;
        Ok(Arc::new(connection))
    }
}

impl std::fmt::Debug for HttpWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWallet")
            .field("url", &self.url)
            .field("poll_interval_ms", &self.poll_interval.as_millis())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(accounts: &[u8], chain: u64) -> WalletSnapshot {
        WalletSnapshot {
            accounts: accounts.iter().map(|b| Address::repeat_byte(*b)).collect(),
            chain_id: ChainId(chain),
        }
    }

    #[test]
    fn test_first_snapshot_is_baseline() {
        assert!(diff_snapshots(None, &snapshot(&[1], 1)).is_empty());
    }

    #[test]
    fn test_diff_orders_chain_before_accounts() {
        let events = diff_snapshots(Some(&snapshot(&[1], 1)), &snapshot(&[], 5));
        assert_eq!(
            events,
            vec![
                WalletEvent::ChainChanged(ChainId(5)),
                WalletEvent::AccountsChanged(Vec::new()),
            ]
        );
    }

    #[test]
    fn test_no_change_no_events() {
        assert!(diff_snapshots(Some(&snapshot(&[1, 2], 1)), &snapshot(&[1, 2], 1)).is_empty());
    }

    #[test]
    fn test_unreachable_wallet_is_network_fault() {
        let err = alloy::transports::TransportErrorKind::custom_str("connection refused");
        let fault = wallet_fault(err);
        assert!(fault.code.is_none());
        assert!(fault.message.starts_with("network error contacting wallet"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = WalletProviderConfig::default();
        let err = HttpWallet::new("not a url", &config, RpcTimings::default()).unwrap_err();
        assert!(err.message.contains("Invalid wallet URL"));
    }
}
