//! Blockchain connections with timeout and error handling.
//!
//! # Responsibilities
//! - Abstract the RPC surface every component reads and writes through
//! - Query chain state (chain id, balances, gas price, receipts)
//! - Submit transactions and wait for their receipts
//! - Handle timeouts and failover across endpoints

use std::sync::Arc;
use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::{interval, timeout};

use crate::blockchain::types::{ChainId, ProviderFault, ProviderResult, ReceiptOutcome};

/// An RPC connection, optionally able to sign for one account.
///
/// The user's wallet hands out a signing connection; the resolver's
/// fallback is read-only.
#[async_trait]
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Account that signs transactions sent through this connection.
    fn signer(&self) -> Option<Address>;

    async fn chain_id(&self) -> ProviderResult<ChainId>;

    /// Current legacy gas price in wei.
    async fn gas_price(&self) -> ProviderResult<u128>;

    async fn native_balance(&self, owner: Address) -> ProviderResult<U256>;

    /// Read-only contract call (`eth_call`).
    async fn call(&self, tx: TransactionRequest) -> ProviderResult<Bytes>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> ProviderResult<u64>;

    /// Submit a transaction; returns once the node accepted it.
    async fn send_transaction(&self, tx: TransactionRequest) -> ProviderResult<TxHash>;

    /// Wait until the transaction is included.
    async fn wait_for_receipt(&self, hash: TxHash) -> ProviderResult<ReceiptOutcome>;

    /// A connection to the same endpoint signing locally with `signer`.
    fn with_signer(&self, signer: PrivateKeySigner) -> ProviderResult<Arc<dyn Connection>>;
}

/// Timing settings shared by RPC connections.
#[derive(Debug, Clone, Copy)]
pub struct RpcTimings {
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// Maximum wait for a receipt.
    pub confirmation_timeout: Duration,
    /// Receipt polling interval.
    pub poll_interval: Duration,
}

impl Default for RpcTimings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(180),
            poll_interval: Duration::from_secs(2),
        }
    }
}

struct Endpoint {
    url: url::Url,
    provider: Arc<dyn Provider + Send + Sync>,
}

/// Alloy-backed connection with optional failover.
#[derive(Clone)]
pub struct RpcConnection {
    /// Endpoints in preference order (primary + failovers).
    endpoints: Arc<Vec<Endpoint>>,
    signer: Option<Address>,
    timings: RpcTimings,
}

fn parse_url(raw: &str) -> ProviderResult<url::Url> {
    raw.parse()
        .map_err(|e| ProviderFault::message(format!("Invalid RPC URL '{}': {}", raw, e)))
}

impl RpcConnection {
    /// Read-only connection over one or more endpoints.
    ///
    /// Invalid failover URLs are skipped; an invalid primary URL is an error.
    pub fn read_only(urls: &[String], timings: RpcTimings) -> ProviderResult<Self> {
        let (primary, failovers) = urls
            .split_first()
            .ok_or_else(|| ProviderFault::message("No RPC endpoint configured"))?;

        let mut endpoints = Vec::with_capacity(urls.len());
        let url = parse_url(primary)?;
        endpoints.push(Endpoint {
            provider: Arc::new(ProviderBuilder::new().connect_http(url.clone())),
            url,
        });

        for raw in failovers {
            match parse_url(raw) {
                Ok(url) => endpoints.push(Endpoint {
                    provider: Arc::new(ProviderBuilder::new().connect_http(url.clone())),
                    url,
                }),
                Err(_) => tracing::warn!(url = %raw, "Ignoring invalid failover RPC URL"),
            }
        }

        Ok(Self {
            endpoints: Arc::new(endpoints),
            signer: None,
            timings,
        })
    }

    /// Connection whose transactions are signed by the node behind `url`
    /// on behalf of `account` (`eth_sendTransaction`).
    pub fn for_account(url: &str, account: Address, timings: RpcTimings) -> ProviderResult<Self> {
        let mut connection = Self::read_only(&[url.to_string()], timings)?;
        connection.signer = Some(account);
        Ok(connection)
    }

    /// Primary endpoint URL.
    pub fn url(&self) -> &url::Url {
        &self.endpoints[0].url
    }

    /// Number of endpoints tried for reads.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    fn primary(&self) -> &(dyn Provider + Send + Sync) {
        self.endpoints[0].provider.as_ref()
    }

    async fn with_deadline<T, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: std::future::Future<Output = Result<T, alloy::transports::TransportError>>,
    {
        match timeout(self.timings.request_timeout, fut).await {
            Ok(result) => result.map_err(ProviderFault::from),
            Err(_) => Err(ProviderFault::timeout(self.timings.request_timeout.as_secs())),
        }
    }
}

/// Run a read against each endpoint in order until one answers.
macro_rules! read_with_failover {
    ($self:ident, $what:literal, |$provider:ident| $call:expr) => {{
        let mut last_fault =
            ProviderFault::message(concat!("All RPC providers failed to get ", $what));
        for (i, endpoint) in $self.endpoints.iter().enumerate() {
            let $provider = endpoint.provider.as_ref();
            match $self.with_deadline($call).await {
                Ok(result) => return Ok(result),
                Err(fault) => {
                    tracing::warn!(
                        provider_idx = i,
                        url = %endpoint.url,
                        what = $what,
                        error = %fault,
                        "RPC error, trying next provider"
                    );
                    last_fault = fault;
                }
            }
        }
        Err(last_fault)
    }};
}

#[async_trait]
impl Connection for RpcConnection {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        read_with_failover!(self, "chain id", |provider| async {
            provider.get_chain_id().await.map(ChainId)
        })
    }

    async fn gas_price(&self) -> ProviderResult<u128> {
        read_with_failover!(self, "gas price", |provider| provider.get_gas_price())
    }

    async fn native_balance(&self, owner: Address) -> ProviderResult<U256> {
        read_with_failover!(self, "balance", |provider| async {
            provider.get_balance(owner).await
        })
    }

    async fn call(&self, tx: TransactionRequest) -> ProviderResult<Bytes> {
        read_with_failover!(self, "call result", |provider| async {
            provider.call(tx.clone()).await
        })
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> ProviderResult<u64> {
        read_with_failover!(self, "gas estimate", |provider| async {
            provider.estimate_gas(tx.clone()).await
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> ProviderResult<TxHash> {
        if self.signer.is_none() {
            return Err(ProviderFault::message(
                "Read-only connection cannot send transactions",
            ));
        }

        // Writes never fail over: a second endpoint could double-submit.
        let pending = self
            .with_deadline(self.primary().send_transaction(tx))
            .await?;
        let hash = *pending.tx_hash();
        tracing::info!(tx_hash = %hash, "Transaction submitted");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> ProviderResult<ReceiptOutcome> {
        let result = timeout(self.timings.confirmation_timeout, async {
            let mut ticker = interval(self.timings.poll_interval);

            loop {
                ticker.tick().await;

                let receipt = match self
                    .with_deadline(self.primary().get_transaction_receipt(hash))
                    .await?
                {
                    Some(r) => r,
                    None => {
                        tracing::debug!(tx_hash = %hash, "Transaction pending");
                        continue;
                    }
                };

                if receipt.status() {
                    return Ok(ReceiptOutcome::Success {
                        hash,
                        block_number: receipt.block_number,
                    });
                }
                return Ok(ReceiptOutcome::Reverted { hash });
            }
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderFault::timeout(
                self.timings.confirmation_timeout.as_secs(),
            )),
        }
    }

    fn with_signer(&self, signer: PrivateKeySigner) -> ProviderResult<Arc<dyn Connection>> {
        let address = signer.address();
        let url = self.url().clone();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url.clone());

        Ok(Arc::new(Self {
            endpoints: Arc::new(vec![Endpoint {
                url,
                provider: Arc::new(provider),
            }]),
            signer: Some(address),
            timings: self.timings,
        }))
    }
}

impl std::fmt::Debug for RpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConnection")
            .field("url", &self.url().as_str())
            .field("endpoints", &self.endpoints.len())
            .field("signer", &self.signer)
            .field("timeout_secs", &self.timings.request_timeout.as_secs())
            .finish()
    }
}
