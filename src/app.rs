//! Composition root: builds every component from one configuration.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;

use crate::balances::BalanceRefresher;
use crate::blockchain::connection::Connection;
use crate::blockchain::resolver::ProviderResolver;
use crate::blockchain::tokens::TokenRegistry;
use crate::blockchain::types::ChainId;
use crate::config::WalletConfig;
use crate::error::{WalletError, WalletResult};
use crate::faucet::TreasuryFaucet;
use crate::lifecycle::Shutdown;
use crate::provider::{HttpWallet, WalletProvider};
use crate::session::WalletSession;
use crate::transfer::{GasEstimator, TransactionHistory, TransferOrchestrator};

pub struct WalletApp {
    pub config: WalletConfig,
    pub tokens: TokenRegistry,
    pub resolver: ProviderResolver,
    pub session: WalletSession,
    pub orchestrator: TransferOrchestrator,
    pub estimator: GasEstimator,
    pub faucet: TreasuryFaucet,
    wallet: Option<Arc<HttpWallet>>,
    shutdown: Shutdown,
}

impl WalletApp {
    /// Wire components from a validated configuration. Nothing runs until
    /// [`start`](Self::start).
    pub fn from_config(config: WalletConfig) -> WalletResult<Self> {
        let resolver = ProviderResolver::new(config.rpc.clone(), &config.transfer);
        let tokens = TokenRegistry::from_config(&config.tokens);

        let wallet = match config.wallet.url.as_deref() {
            Some(url) => Some(Arc::new(HttpWallet::new(
                url,
                &config.wallet,
                resolver.timings(),
            )?)),
            None => None,
        };
        let provider = wallet
            .clone()
            .map(|w| w as Arc<dyn WalletProvider>);
        let session = WalletSession::new(provider, &config.network);

        let history = match &config.history.path {
            Some(path) => TransactionHistory::open(path),
            None => TransactionHistory::new(None),
        };

        let guard = session.network_guard().cloned();
        let orchestrator =
            TransferOrchestrator::new(tokens.clone(), history, &config.transfer, guard.clone());
        let estimator = GasEstimator::new(orchestrator.clone(), guard, &config.transfer);
        let target = ChainId(config.network.chain_id);
        let faucet = TreasuryFaucet::from_env(config.faucet.clone(), target)?;

        Ok(Self {
            config,
            tokens,
            resolver,
            session,
            orchestrator,
            estimator,
            faucet,
            wallet,
            shutdown: Shutdown::new(),
        })
    }

    /// Start the wallet poller and restore any existing session.
    pub async fn start(&self) {
        if let Some(wallet) = &self.wallet {
            tokio::spawn(Arc::clone(wallet).watch_events(self.shutdown.subscribe()));
        }
        self.session.init(self.shutdown.subscribe()).await;
    }

    /// The session's signing connection, or the read-only fallback.
    pub async fn read_connection(&self) -> WalletResult<Arc<dyn Connection>> {
        self.resolver.resolve(self.session.connection().as_ref()).await
    }

    /// Signing connection, connecting the wallet first when needed.
    pub async fn signing_connection(&self) -> WalletResult<Arc<dyn Connection>> {
        if let Some(connection) = self.session.connection() {
            return Ok(connection);
        }
        self.session.connect().await?;
        self.session.connection().ok_or(WalletError::NoAccounts)
    }

    /// `explicit`, else the connected account.
    pub fn account(&self, explicit: Option<Address>) -> WalletResult<Address> {
        explicit
            .or(self.session.session().address)
            .ok_or(WalletError::NoAccounts)
    }

    /// Balance refresher for `owner`, on the configured period.
    pub async fn balance_refresher(&self, owner: Address) -> WalletResult<Arc<BalanceRefresher>> {
        let connection = self.read_connection().await?;
        Ok(Arc::new(BalanceRefresher::new(
            connection,
            owner,
            self.tokens.clone(),
            Duration::from_secs(self.config.balances.refresh_interval_secs),
        )))
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Stop background tasks and freeze the session.
    pub fn stop(&self) {
        self.shutdown.trigger();
        self.session.dispose();
        if let Err(e) = self.orchestrator.history().save_to_file() {
            tracing::warn!(error = %e, "Failed to save transaction history");
        }
    }
}

impl std::fmt::Debug for WalletApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletApp")
            .field("session", &self.session)
            .field("tokens", &self.tokens.len())
            .field("faucet", &self.faucet)
            .finish()
    }
}
