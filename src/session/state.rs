//! Session and network state snapshots.

use alloy::primitives::Address;

use crate::blockchain::types::ChainId;
use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

/// Snapshot of the wallet session.
///
/// `address` is `Some` exactly when `state` is `Connected`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub address: Option<Address>,
    pub state: ConnectionState,
    pub last_error: Option<WalletError>,
}

/// The only ways a session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Connecting,
    Connected(Address),
    /// `None` for a deliberate disconnect or a wallet lock.
    Disconnected(Option<WalletError>),
    ErrorCleared,
}

impl Transition {
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Connecting => "connecting",
            Transition::Connected(_) => "connected",
            Transition::Disconnected(Some(_)) => "failed",
            Transition::Disconnected(None) => "disconnected",
            Transition::ErrorCleared => "error_cleared",
        }
    }
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The session after `transition`.
    pub fn apply(&self, transition: &Transition) -> Session {
        match transition {
            Transition::Connecting => Session {
                address: None,
                state: ConnectionState::Connecting,
                last_error: None,
            },
            Transition::Connected(address) => Session {
                address: Some(*address),
                state: ConnectionState::Connected,
                last_error: None,
            },
            Transition::Disconnected(error) => Session {
                address: None,
                state: ConnectionState::Disconnected,
                last_error: error.clone(),
            },
            Transition::ErrorCleared => Session {
                last_error: None,
                ..self.clone()
            },
        }
    }
}

/// Chain the wallet currently reports, and whether it is the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkState {
    pub chain_id: ChainId,
    pub is_supported: bool,
}
