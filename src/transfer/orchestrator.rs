//! ERC-20 transfer orchestration.
//!
//! # Responsibilities
//! - Estimate gas for a transfer without side effects
//! - Submit a transfer with a buffered gas limit and legacy gas price
//! - Expose the `Idle → Pending → Success | Error` lifecycle
//! - Record successful transfers in the history
//!
//! # Design Decisions
//! - Validation failures return immediately and leave the status alone
//! - Terminal states return to `Idle` after the reset window; a newer
//!   submission or an explicit reset cancels a pending auto-reset
//! - The token balance is checked before any gas estimate, so an
//!   oversized transfer never reaches the node

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use tokio::sync::watch;

use crate::blockchain::connection::Connection;
use crate::blockchain::tokens::{TokenDescriptor, TokenRegistry};
use crate::blockchain::types::{buffered_gas_limit, GasEstimate, ReceiptOutcome};
use crate::config::TransferConfig;
use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::session::NetworkGuard;
use crate::transfer::history::{TransactionHistory, TransactionRecord, TransactionStatus};
use crate::transfer::request::TransferRequest;

/// Lifecycle of the most recent submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransferStatus {
    #[default]
    Idle,
    Pending,
    Success { hash: TxHash },
    Error { error: WalletError },
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Success { .. } | TransferStatus::Error { .. })
    }
}

/// Gas estimation and token transfers. Cheap to clone.
#[derive(Clone)]
pub struct TransferOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    tokens: TokenRegistry,
    history: TransactionHistory,
    guard: Option<Arc<NetworkGuard>>,
    gas_buffer_percent: u64,
    reset_after: Duration,
    status: watch::Sender<TransferStatus>,
    /// Bumped by every submission and reset; stale auto-resets compare it.
    generation: AtomicU64,
}

impl TransferOrchestrator {
    /// `guard`, when present, gates submissions on the supported network.
    pub fn new(
        tokens: TokenRegistry,
        history: TransactionHistory,
        config: &TransferConfig,
        guard: Option<Arc<NetworkGuard>>,
    ) -> Self {
        let (status, _) = watch::channel(TransferStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                tokens,
                history,
                guard,
                gas_buffer_percent: config.gas_buffer_percent,
                reset_after: Duration::from_secs(config.reset_after_secs),
                status,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn status(&self) -> TransferStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransferStatus> {
        self.inner.status.subscribe()
    }

    pub fn history(&self) -> &TransactionHistory {
        &self.inner.history
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.inner.tokens
    }

    fn token(&self, symbol: &str) -> WalletResult<&TokenDescriptor> {
        self.inner
            .tokens
            .get(symbol)
            .ok_or_else(|| WalletError::UnsupportedToken(symbol.to_string()))
    }

    /// Read-only gas estimate for `request`.
    pub async fn estimate_gas(
        &self,
        request: &TransferRequest,
        connection: &dyn Connection,
    ) -> WalletResult<GasEstimate> {
        let recipient = request.validate()?;
        let token = self.token(&request.token)?;
        let contract = token.contract();

        let decimals = contract.decimals(connection).await?;
        let amount = request.amount_units(decimals)?;

        let tx = contract.transfer_request(connection.signer(), recipient, amount);
        let gas_limit = connection.estimate_gas(tx).await?;
        let gas_price = connection.gas_price().await?;

        Ok(GasEstimate::new(gas_limit, gas_price))
    }

    /// Submit a transfer and wait for inclusion.
    pub async fn send_token(
        &self,
        request: &TransferRequest,
        connection: &dyn Connection,
    ) -> WalletResult<TxHash> {
        let recipient = request.validate()?;

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.status.send_replace(TransferStatus::Pending);
        tracing::info!(
            token = %request.token,
            amount = %request.amount,
            recipient = %recipient,
            "Transfer pending"
        );

        let result = self.execute(request, recipient, connection).await;

        let status = match &result {
            Ok(hash) => {
                self.inner.history.record(TransactionRecord::new(
                    *hash,
                    TransactionStatus::Success,
                    recipient,
                    request.amount.clone(),
                    request.token.clone(),
                ));
                tracing::info!(tx_hash = %hash, token = %request.token, "Transfer confirmed");
                metrics::record_transfer(&request.token, "success");
                TransferStatus::Success { hash: *hash }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kind = err.kind().as_str(),
                    token = %request.token,
                    "Transfer failed"
                );
                metrics::record_transfer(&request.token, "error");
                TransferStatus::Error { error: err.clone() }
            }
        };

        // A newer submission or a reset owns the status now.
        if self.inner.generation.load(Ordering::Acquire) == generation {
            self.inner.status.send_replace(status);
            self.schedule_reset(generation);
        }
        result
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        recipient: Address,
        connection: &dyn Connection,
    ) -> WalletResult<TxHash> {
        if let Some(guard) = &self.inner.guard {
            guard.require_supported().await?;
        }

        let token = self.token(&request.token)?;
        let contract = token.contract();
        let sender = connection.signer().ok_or(WalletError::NoAccounts)?;

        let decimals = contract.decimals(connection).await?;
        let amount = request.amount_units(decimals)?;
        let balance = contract.balance_of(connection, sender).await?;
        if balance < amount {
            return Err(WalletError::InsufficientFunds(
                "Insufficient token balance".to_string(),
            ));
        }

        let tx = contract.transfer_request(Some(sender), recipient, amount);
        let estimate = connection.estimate_gas(tx.clone()).await?;
        let gas_price = connection.gas_price().await?;
        let gas_limit = buffered_gas_limit(estimate, self.inner.gas_buffer_percent);
        tracing::debug!(estimate, gas_limit, gas_price, "Gas settings for transfer");

        let tx = tx.with_gas_limit(gas_limit).with_gas_price(gas_price);
        let hash = connection.send_transaction(tx).await?;

        match connection.wait_for_receipt(hash).await? {
            ReceiptOutcome::Success { hash, .. } => Ok(hash),
            ReceiptOutcome::Reverted { hash } => {
                tracing::warn!(tx_hash = %hash, "Transfer reverted");
                Err(WalletError::Unknown("Transaction failed".to_string()))
            }
        }
    }

    fn schedule_reset(&self, generation: u64) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.reset_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if inner.generation.load(Ordering::Acquire) == generation {
                inner.status.send_replace(TransferStatus::Idle);
                tracing::debug!("Transfer status reset to idle");
            }
        });
    }

    /// Return to `Idle` immediately.
    pub fn reset_transaction(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.status.send_replace(TransferStatus::Idle);
    }
}

impl std::fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("status", &self.status())
            .field("tokens", &self.inner.tokens.len())
            .field("gas_buffer_percent", &self.inner.gas_buffer_percent)
            .finish()
    }
}
