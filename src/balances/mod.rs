//! Balance reads and periodic refresh.
//!
//! Token reads run concurrently. A token whose read fails shows up as an
//! "(Unavailable)" zero entry instead of failing the whole refresh.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::blockchain::connection::Connection;
use crate::blockchain::tokens::{TokenDescriptor, TokenRegistry};
use crate::blockchain::types::{ProviderFault, ProviderResult};
use crate::error::WalletResult;
use crate::faucet::BalanceLevel;

/// One token balance, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub name: String,
    pub address: Address,
    pub decimals: u8,
    /// Four fractional digits, e.g. `"12.5000"`.
    pub balance: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBalance {
    pub wei: U256,
    pub formatted: String,
    pub level: BalanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub owner: Address,
    pub native: Option<NativeBalance>,
    pub tokens: Vec<TokenBalance>,
    pub updated_at: SystemTime,
}

/// Round a decimal string to four fractional digits.
pub fn four_decimals(value: &str) -> String {
    format!("{:.4}", value.parse::<f64>().unwrap_or(0.0))
}

async fn read_token_balance(
    connection: &dyn Connection,
    owner: Address,
    token: &TokenDescriptor,
) -> ProviderResult<String> {
    let raw = token.contract().balance_of(connection, owner).await?;
    format_units(raw, token.decimals).map_err(|e| ProviderFault::message(e.to_string()))
}

async fn token_balance(
    connection: &dyn Connection,
    owner: Address,
    token: &TokenDescriptor,
) -> TokenBalance {
    match read_token_balance(connection, owner, token).await {
        Ok(formatted) => TokenBalance {
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            address: token.contract_address,
            decimals: token.decimals,
            balance: four_decimals(&formatted),
            available: true,
        },
        Err(fault) => {
            tracing::warn!(token = %token.symbol, error = %fault, "Token balance unavailable");
            TokenBalance {
                symbol: token.symbol.clone(),
                name: format!("{} (Unavailable)", token.name),
                address: token.contract_address,
                decimals: token.decimals,
                balance: "0.0000".to_string(),
                available: false,
            }
        }
    }
}

/// Balances of every registered token, in registry order.
pub async fn fetch_balances(
    connection: &dyn Connection,
    owner: Address,
    registry: &TokenRegistry,
) -> Vec<TokenBalance> {
    join_all(
        registry
            .iter()
            .map(|token| token_balance(connection, owner, token)),
    )
    .await
}

pub async fn fetch_native(connection: &dyn Connection, owner: Address) -> WalletResult<NativeBalance> {
    let wei = connection.native_balance(owner).await?;
    Ok(NativeBalance {
        wei,
        formatted: four_decimals(&format_ether(wei)),
        level: BalanceLevel::assess(wei),
    })
}

/// Periodically re-reads balances for one owner and publishes snapshots.
pub struct BalanceRefresher {
    connection: Arc<dyn Connection>,
    owner: Address,
    registry: TokenRegistry,
    period: Duration,
    snapshot: watch::Sender<Option<BalanceSnapshot>>,
}

impl BalanceRefresher {
    pub fn new(
        connection: Arc<dyn Connection>,
        owner: Address,
        registry: TokenRegistry,
        period: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            connection,
            owner,
            registry,
            period,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Read everything once and publish it.
    pub async fn refresh(&self) -> BalanceSnapshot {
        let connection = self.connection.as_ref();
        let (native, tokens) = tokio::join!(
            fetch_native(connection, self.owner),
            fetch_balances(connection, self.owner, &self.registry)
        );

        let native = match native {
            Ok(native) => Some(native),
            Err(err) => {
                tracing::warn!(error = %err, "Native balance unavailable");
                None
            }
        };

        let snapshot = BalanceSnapshot {
            owner: self.owner,
            native,
            tokens,
            updated_at: SystemTime::now(),
        };
        self.snapshot.send_replace(Some(snapshot.clone()));
        tracing::debug!(owner = %self.owner, "Balances refreshed");
        snapshot
    }

    /// Refresh immediately, then on every period until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            owner = %self.owner,
            period_secs = self.period.as_secs(),
            "Balance refresher starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Balance refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
