//! Wallet connection lifecycle.
//!
//! # Responsibilities
//! - Connect on user request (account access, inline network switch)
//! - Silently restore an already-authorized session on `init`
//! - Translate wallet notifications into session transitions
//! - Hand out the signing connection of the connected account
//!
//! # Design Decisions
//! - Every change goes through `commit`, the single transition function
//! - A chain change invalidates the session and connection and re-runs
//!   the init probe, instead of reconciling state in place
//! - Each invalidation bumps an epoch; an operation that started under an
//!   older epoch does not commit its result
//! - After `dispose` no transition is applied; late results are dropped

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use alloy::primitives::Address;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;

use crate::blockchain::connection::Connection;
use crate::config::NetworkConfig;
use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::provider::{WalletEvent, WalletProvider};
use crate::session::network::NetworkGuard;
use crate::session::state::{ConnectionState, NetworkState, Session, Transition};

/// Owned wallet session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<Inner>,
}

struct Inner {
    wallet: Option<Arc<dyn WalletProvider>>,
    guard: Option<Arc<NetworkGuard>>,
    state: watch::Sender<Session>,
    connection: watch::Sender<Option<Arc<dyn Connection>>>,
    epoch: AtomicU64,
    disposed: AtomicBool,
    listener: OnceLock<AbortHandle>,
}

impl WalletSession {
    /// `wallet` is `None` when no wallet is available.
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, network: &NetworkConfig) -> Self {
        let guard = wallet
            .as_ref()
            .map(|w| Arc::new(NetworkGuard::new(Arc::clone(w), network)));
        let (state, _) = watch::channel(Session::default());
        let (connection, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                wallet,
                guard,
                state,
                connection,
                epoch: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                listener: OnceLock::new(),
            }),
        }
    }

    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Signing connection of the connected account.
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.inner.connection.borrow().clone()
    }

    pub fn network_guard(&self) -> Option<&Arc<NetworkGuard>> {
        self.inner.guard.as_ref()
    }

    pub fn network(&self) -> Option<NetworkState> {
        self.inner.guard.as_ref().and_then(|g| g.network())
    }

    pub fn is_wrong_network(&self) -> bool {
        self.inner
            .guard
            .as_ref()
            .is_some_and(|g| g.is_wrong_network())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Probe existing authorization, then start reacting to wallet events
    /// until `shutdown` fires or the session is disposed.
    pub async fn init(&self, shutdown: broadcast::Receiver<()>) {
        let Some(wallet) = self.inner.wallet.clone() else {
            tracing::info!("No wallet configured, session stays disconnected");
            return;
        };

        // Subscribe before probing so no change slips between the two.
        let events = wallet.subscribe();
        self.probe().await;

        let session = self.clone();
        let handle = tokio::spawn(async move { session.listen(events, shutdown).await });
        if self.inner.listener.set(handle.abort_handle()).is_err() {
            tracing::warn!("Session already initialized, dropping duplicate listener");
            handle.abort();
        }
    }

    async fn listen(
        &self,
        mut events: broadcast::Receiver<WalletEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed wallet events, re-probing");
                        self.probe().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Wallet event channel closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Session listener received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Request account access and connect, switching network if needed.
    ///
    /// The session only changes if no disconnect or chain change happened
    /// while the wallet was prompting.
    pub async fn connect(&self) -> WalletResult<Address> {
        let (Some(wallet), Some(guard)) = (&self.inner.wallet, &self.inner.guard) else {
            let err = WalletError::ProviderMissing;
            self.commit(Transition::Disconnected(Some(err.clone())), None);
            return Err(err);
        };

        let epoch = self.inner.epoch.load(Ordering::Acquire);
        self.commit(Transition::Connecting, None);

        let result = Self::establish(wallet.as_ref(), guard).await;
        if self.inner.epoch.load(Ordering::Acquire) != epoch {
            tracing::debug!("Session invalidated during connect, result ignored");
            return result.map(|(address, _)| address);
        }

        match result {
            Ok((address, connection)) => {
                self.commit(Transition::Connected(address), Some(connection));
                Ok(address)
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind().as_str(), "Wallet connect failed");
                self.commit(Transition::Disconnected(Some(err.clone())), None);
                Err(err)
            }
        }
    }

    async fn establish(
        wallet: &dyn WalletProvider,
        guard: &NetworkGuard,
    ) -> WalletResult<(Address, Arc<dyn Connection>)> {
        let accounts = wallet.request_accounts().await?;
        let address = *accounts.first().ok_or(WalletError::NoAccounts)?;

        let network = guard.check_network().await?;
        if !network.is_supported {
            guard.switch_network().await?;
        }

        let connection = wallet.connection(address)?;
        Ok((address, connection))
    }

    /// Clear the session. Never touches the wallet.
    pub fn disconnect(&self) {
        self.invalidate();
        self.commit(Transition::Disconnected(None), None);
    }

    pub fn clear_error(&self) {
        self.commit(Transition::ErrorCleared, None);
    }

    /// Delegate to the network guard; `ProviderMissing` without a wallet.
    pub async fn switch_network(&self) -> WalletResult<NetworkState> {
        match &self.inner.guard {
            Some(guard) => guard.switch_network().await,
            None => Err(WalletError::ProviderMissing),
        }
    }

    /// Apply one wallet notification.
    pub async fn handle_event(&self, event: WalletEvent) {
        if self.is_disposed() {
            return;
        }
        let Some(guard) = self.inner.guard.clone() else {
            return;
        };

        match event {
            WalletEvent::AccountsChanged(accounts) => {
                let Some(&address) = accounts.first() else {
                    tracing::info!("Wallet reported no accounts, disconnecting");
                    self.invalidate();
                    self.commit(Transition::Disconnected(None), None);
                    return;
                };

                let epoch = self.inner.epoch.load(Ordering::Acquire);
                let network = match guard.check_network().await {
                    Ok(network) => network,
                    Err(err) => {
                        tracing::warn!(error = %err, "Chain check after account change failed");
                        return;
                    }
                };
                if self.inner.epoch.load(Ordering::Acquire) != epoch {
                    return;
                }

                if !network.is_supported {
                    let err = WalletError::UnsupportedNetwork {
                        expected: guard.target().0,
                        actual: network.chain_id.0,
                    };
                    self.commit(Transition::Disconnected(Some(err)), None);
                    return;
                }

                match self.wallet_connection(address) {
                    Ok(connection) => {
                        self.commit(Transition::Connected(address), Some(connection))
                    }
                    Err(err) => self.commit(Transition::Disconnected(Some(err)), None),
                }
            }
            WalletEvent::ChainChanged(chain_id) => {
                guard.observe_chain(chain_id);
                tracing::info!(chain_id = %chain_id, "Chain changed, reinitializing session");
                self.invalidate();
                self.commit(Transition::Disconnected(None), None);
                self.probe().await;
            }
        }
    }

    /// Silently connect when the wallet already authorized an account on
    /// the supported chain. Failures are logged, never recorded.
    async fn probe(&self) {
        let (Some(wallet), Some(guard)) = (&self.inner.wallet, &self.inner.guard) else {
            return;
        };
        let epoch = self.inner.epoch.load(Ordering::Acquire);

        let restored = Self::existing_authorization(wallet.as_ref(), guard).await;

        if self.inner.epoch.load(Ordering::Acquire) != epoch {
            return;
        }
        match restored {
            Ok(Some((address, connection))) => {
                if self.session().state == ConnectionState::Disconnected {
                    tracing::info!(address = %address, "Restored existing wallet authorization");
                    self.commit(Transition::Connected(address), Some(connection));
                }
            }
            Ok(None) => tracing::debug!("No existing wallet authorization"),
            Err(err) => tracing::warn!(error = %err, "Wallet probe failed"),
        }
    }

    async fn existing_authorization(
        wallet: &dyn WalletProvider,
        guard: &NetworkGuard,
    ) -> WalletResult<Option<(Address, Arc<dyn Connection>)>> {
        let network = guard.check_network().await?;
        let accounts = wallet.accounts().await?;
        match accounts.first() {
            Some(&address) if network.is_supported => {
                Ok(Some((address, wallet.connection(address)?)))
            }
            _ => Ok(None),
        }
    }

    fn wallet_connection(&self, address: Address) -> WalletResult<Arc<dyn Connection>> {
        let wallet = self
            .inner
            .wallet
            .as_ref()
            .ok_or(WalletError::ProviderMissing)?;
        Ok(wallet.connection(address)?)
    }

    fn invalidate(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// The single transition function.
    fn commit(&self, transition: Transition, connection: Option<Arc<dyn Connection>>) {
        if self.is_disposed() {
            tracing::debug!(transition = transition.label(), "Session disposed, ignoring");
            return;
        }

        match &transition {
            Transition::Connected(_) => {
                self.inner.connection.send_replace(connection);
            }
            Transition::Connecting | Transition::Disconnected(_) => {
                self.inner.connection.send_replace(None);
            }
            Transition::ErrorCleared => {}
        }

        let next = self.inner.state.borrow().apply(&transition);
        tracing::info!(
            transition = transition.label(),
            state = next.state.as_str(),
            address = ?next.address,
            "Session transition"
        );
        metrics::record_session_transition(transition.label());
        self.inner.state.send_replace(next);
    }

    /// Stop reacting to wallet events and freeze the session.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.inner.listener.get() {
            handle.abort();
        }
        tracing::info!("Wallet session disposed");
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("session", &self.session())
            .field("has_wallet", &self.inner.wallet.is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let session = WalletSession::new(None, &NetworkConfig::default());
        assert_eq!(session.connect().await, Err(WalletError::ProviderMissing));

        let snapshot = session.session();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert_eq!(snapshot.last_error, Some(WalletError::ProviderMissing));
        assert!(!session.is_wrong_network());

        session.clear_error();
        assert_eq!(session.session().last_error, None);
    }

    #[tokio::test]
    async fn test_disposed_session_ignores_changes() {
        let session = WalletSession::new(None, &NetworkConfig::default());
        session.dispose();
        let _ = session.connect().await;
        assert_eq!(session.session(), Session::default());
    }
}
