//! Faucet outcomes and balance advice.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Result of a gas top-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TopupOutcome {
    /// The treasury sent the funds directly.
    Treasury {
        hash: TxHash,
        /// Native amount, e.g. `"0.1 ETH"`.
        amount: String,
        treasury: Address,
    },
    /// A third-party faucet accepted the request.
    Faucet { name: String },
    /// Nothing worked; the user has to visit the faucet page.
    Manual { url: String },
}

impl TopupOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, TopupOutcome::Manual { .. })
    }
}

/// Lifecycle of the most recent top-up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TopupStatus {
    #[default]
    Idle,
    Requesting,
    Done { outcome: TopupOutcome },
    Error { error: WalletError },
}

impl TopupStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TopupStatus::Done { .. } | TopupStatus::Error { .. })
    }
}

/// Treasury balance, formatted in whole native units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryInfo {
    pub balance: String,
    /// Whether the balance exceeds one top-up.
    pub available: bool,
}

impl TreasuryInfo {
    pub fn unavailable() -> Self {
        Self {
            balance: "0".to_string(),
            available: false,
        }
    }
}

/// Per-token faucet result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFaucetResult {
    pub token: String,
    /// Name of the faucet that accepted the request.
    pub faucet: Option<String>,
    /// Page the user has to visit for this token.
    pub manual_url: Option<String>,
    pub error: Option<String>,
}

impl TokenFaucetResult {
    pub fn is_success(&self) -> bool {
        self.faucet.is_some()
    }

    pub fn is_manual(&self) -> bool {
        self.manual_url.is_some()
    }
}

/// How urgently the native balance needs a top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceLevel {
    /// Below 0.01; transfers will likely fail for gas.
    Critical,
    /// Below 0.05.
    Low,
    Healthy,
}

const CRITICAL_BELOW_WEI: u128 = 10_000_000_000_000_000;
const LOW_BELOW_WEI: u128 = 50_000_000_000_000_000;

impl BalanceLevel {
    pub fn assess(balance_wei: U256) -> Self {
        if balance_wei < U256::from(CRITICAL_BELOW_WEI) {
            BalanceLevel::Critical
        } else if balance_wei < U256::from(LOW_BELOW_WEI) {
            BalanceLevel::Low
        } else {
            BalanceLevel::Healthy
        }
    }

    pub fn needs_topup(&self) -> bool {
        *self == BalanceLevel::Critical
    }
}
