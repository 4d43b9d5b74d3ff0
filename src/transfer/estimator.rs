//! Debounced gas estimation for input that changes as the user types.
//!
//! Each call to [`GasEstimator::update`] supersedes the previous one. The
//! estimate runs only after the input has been quiet for the debounce
//! delay, and a response is published only if its input is still the
//! latest, so a slow early estimate can never overwrite a newer one.
//! Failures hide the estimate instead of surfacing an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::blockchain::connection::Connection;
use crate::blockchain::types::GasEstimate;
use crate::config::TransferConfig;
use crate::session::NetworkGuard;
use crate::transfer::orchestrator::TransferOrchestrator;
use crate::transfer::request::TransferRequest;

/// What the form shows next to the transfer inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimateView {
    #[default]
    Hidden,
    Estimating,
    Ready(GasEstimate),
}

#[derive(Clone)]
pub struct GasEstimator {
    inner: Arc<Inner>,
}

struct Inner {
    orchestrator: TransferOrchestrator,
    guard: Option<Arc<NetworkGuard>>,
    debounce: Duration,
    latest: AtomicU64,
    view: watch::Sender<EstimateView>,
}

impl Inner {
    fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::Acquire) == ticket
    }

    /// Publish `view` only if `ticket` is still the latest input. The check
    /// runs under the channel lock, so a newer input's view lands after it.
    fn publish(&self, ticket: u64, view: EstimateView) -> bool {
        let mut published = false;
        self.view.send_if_modified(|current| {
            published = self.is_latest(ticket);
            if published {
                *current = view;
            }
            published
        });
        published
    }
}

impl GasEstimator {
    pub fn new(
        orchestrator: TransferOrchestrator,
        guard: Option<Arc<NetworkGuard>>,
        config: &TransferConfig,
    ) -> Self {
        let (view, _) = watch::channel(EstimateView::Hidden);
        Self {
            inner: Arc::new(Inner {
                orchestrator,
                guard,
                debounce: Duration::from_millis(config.debounce_ms),
                latest: AtomicU64::new(0),
                view,
            }),
        }
    }

    pub fn view(&self) -> EstimateView {
        *self.inner.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EstimateView> {
        self.inner.view.subscribe()
    }

    /// Register new input. Returns the ticket identifying it.
    pub fn update(
        &self,
        request: TransferRequest,
        connection: Option<Arc<dyn Connection>>,
    ) -> u64 {
        let ticket = self.inner.latest.fetch_add(1, Ordering::AcqRel) + 1;

        let wrong_network = self
            .inner
            .guard
            .as_ref()
            .is_some_and(|g| g.is_wrong_network());
        let connection = match connection {
            Some(connection)
                if !wrong_network
                    && !request.recipient.is_empty()
                    && !request.amount.is_empty()
                    && request.validate().is_ok() =>
            {
                connection
            }
            _ => {
                self.inner.view.send_replace(EstimateView::Hidden);
                return ticket;
            }
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if !inner.publish(ticket, EstimateView::Estimating) {
                return;
            }

            let view = match inner
                .orchestrator
                .estimate_gas(&request, connection.as_ref())
                .await
            {
                Ok(estimate) => EstimateView::Ready(estimate),
                Err(err) => {
                    tracing::debug!(error = %err, "Gas estimate unavailable");
                    EstimateView::Hidden
                }
            };
            if !inner.publish(ticket, view) {
                tracing::debug!(ticket, "Discarding superseded gas estimate");
            }
        });

        ticket
    }

    /// Drop any pending estimate and hide the view.
    pub fn clear(&self) {
        self.inner.latest.fetch_add(1, Ordering::AcqRel);
        self.inner.view.send_replace(EstimateView::Hidden);
    }
}

impl std::fmt::Debug for GasEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GasEstimator")
            .field("view", &self.view())
            .field("debounce_ms", &self.inner.debounce.as_millis())
            .finish()
    }
}
