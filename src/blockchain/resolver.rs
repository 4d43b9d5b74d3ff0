//! Connection resolution.
//!
//! The user's wallet connection wins when present (it can sign). Otherwise a
//! read-only connection to the configured public endpoints is built once,
//! on first use, and shared for the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::blockchain::connection::{Connection, RpcConnection, RpcTimings};
use crate::config::{RpcConfig, TransferConfig};
use crate::error::WalletResult;

/// Chooses a usable RPC connection.
#[derive(Debug)]
pub struct ProviderResolver {
    config: RpcConfig,
    timings: RpcTimings,
    fallback: OnceCell<Arc<dyn Connection>>,
}

impl ProviderResolver {
    pub fn new(config: RpcConfig, transfer: &TransferConfig) -> Self {
        let timings = RpcTimings {
            request_timeout: Duration::from_secs(config.timeout_secs),
            confirmation_timeout: Duration::from_secs(transfer.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(transfer.receipt_poll_ms),
        };
        Self {
            config,
            timings,
            fallback: OnceCell::new(),
        }
    }

    /// Resolver whose fallback is already built. Used when the caller owns
    /// the read-only connection.
    pub fn with_fallback(fallback: Arc<dyn Connection>) -> Self {
        Self {
            config: RpcConfig::default(),
            timings: RpcTimings::default(),
            fallback: OnceCell::new_with(Some(fallback)),
        }
    }

    pub fn timings(&self) -> RpcTimings {
        self.timings
    }

    /// Return the user's connection unchanged, or the shared fallback.
    pub async fn resolve(
        &self,
        user: Option<&Arc<dyn Connection>>,
    ) -> WalletResult<Arc<dyn Connection>> {
        if let Some(connection) = user {
            return Ok(Arc::clone(connection));
        }
        self.fallback().await
    }

    /// The cached read-only connection.
    pub async fn fallback(&self) -> WalletResult<Arc<dyn Connection>> {
        let connection = self
            .fallback
            .get_or_try_init(|| async {
                let urls = if self.config.failover {
                    self.config.fallback_urls.clone()
                } else {
                    self.config.fallback_urls.iter().take(1).cloned().collect()
                };
                let connection = RpcConnection::read_only(&urls, self.timings)?;
                tracing::info!(
                    url = %connection.url(),
                    endpoints = connection.endpoint_count(),
                    failover = self.config.failover,
                    "Fallback RPC connection initialized"
                );
                Ok::<_, crate::blockchain::types::ProviderFault>(
                    Arc::new(connection) as Arc<dyn Connection>
                )
            })
            .await?;
        Ok(Arc::clone(connection))
    }
}
