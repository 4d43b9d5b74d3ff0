//! Error taxonomy and normalization.
//!
//! Every boundary operation (connect, switch, estimate, send, top-up)
//! resolves to either a value or a [`WalletError`]. Raw provider failures
//! ([`ProviderFault`]) are normalized here and never cross component
//! boundaries untyped.
//!
//! Classification is best-effort: codes are checked first, then the
//! message text is matched by substring.

use thiserror::Error;

use crate::blockchain::types::ProviderFault;

/// EIP-1193 code for an explicit user rejection.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 code for a chain the wallet does not know.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// JSON-RPC internal error code.
pub const INTERNAL_RPC_ERROR_CODE: i64 = -32603;

/// Validation faults of a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid Ethereum address format")]
    Recipient,

    #[error("Amount must be a positive number")]
    Amount,

    #[error("Token is required")]
    Token,
}

/// Closed set of failures surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("No wallet found. Please install a browser wallet.")]
    ProviderMissing,

    #[error("No accounts found. Please unlock your wallet.")]
    NoAccounts,

    #[error("Wrong network - please switch to chain {expected}")]
    UnsupportedNetwork { expected: u64, actual: u64 },

    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Internal JSON-RPC error")]
    RpcFault,

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("Gas estimation failed - check your balance")]
    GasEstimationFailed,

    #[error("Token {0} not supported")]
    UnsupportedToken(String),

    #[error("Treasury insufficient funds. Has: {available} ETH")]
    TreasuryInsufficientFunds { available: String },

    #[error("Network connection failed - please try again")]
    NetworkFailure,

    #[error("A network switch is already in progress")]
    SwitchInProgress,

    #[error("A faucet request is already in progress")]
    FaucetBusy,

    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error("{0}")]
    Unknown(String),
}

/// Fieldless mirror of [`WalletError`] for state snapshots and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ProviderMissing,
    NoAccounts,
    UnsupportedNetwork,
    UserRejected,
    RpcFault,
    InsufficientFunds,
    GasEstimationFailed,
    UnsupportedToken,
    TreasuryInsufficientFunds,
    NetworkFailure,
    SwitchInProgress,
    FaucetBusy,
    InvalidRequest,
    Unknown,
}

impl ErrorKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderMissing => "provider_missing",
            ErrorKind::NoAccounts => "no_accounts",
            ErrorKind::UnsupportedNetwork => "unsupported_network",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::RpcFault => "rpc_fault",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::GasEstimationFailed => "gas_estimation_failed",
            ErrorKind::UnsupportedToken => "unsupported_token",
            ErrorKind::TreasuryInsufficientFunds => "treasury_insufficient_funds",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::SwitchInProgress => "switch_in_progress",
            ErrorKind::FaucetBusy => "faucet_busy",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::ProviderMissing => ErrorKind::ProviderMissing,
            WalletError::NoAccounts => ErrorKind::NoAccounts,
            WalletError::UnsupportedNetwork { .. } => ErrorKind::UnsupportedNetwork,
            WalletError::UserRejected => ErrorKind::UserRejected,
            WalletError::RpcFault => ErrorKind::RpcFault,
            WalletError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            WalletError::GasEstimationFailed => ErrorKind::GasEstimationFailed,
            WalletError::UnsupportedToken(_) => ErrorKind::UnsupportedToken,
            WalletError::TreasuryInsufficientFunds { .. } => ErrorKind::TreasuryInsufficientFunds,
            WalletError::NetworkFailure => ErrorKind::NetworkFailure,
            WalletError::SwitchInProgress => ErrorKind::SwitchInProgress,
            WalletError::FaucetBusy => ErrorKind::FaucetBusy,
            WalletError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            WalletError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Map a raw provider failure into the closed taxonomy.
pub fn normalize(fault: &ProviderFault) -> WalletError {
    match fault.code {
        Some(USER_REJECTED_CODE) => return WalletError::UserRejected,
        Some(INTERNAL_RPC_ERROR_CODE) => return WalletError::RpcFault,
        _ => {}
    }

    let message = fault.message.as_str();
    if message.contains("insufficient funds") {
        WalletError::InsufficientFunds("Insufficient funds for transaction".to_string())
    } else if message.contains("gas") {
        WalletError::GasEstimationFailed
    } else if message.contains("network") {
        WalletError::NetworkFailure
    } else if message.is_empty() {
        WalletError::Unknown("Unknown error occurred".to_string())
    } else {
        WalletError::Unknown(message.to_string())
    }
}

impl From<ProviderFault> for WalletError {
    fn from(fault: ProviderFault) -> Self {
        let err = normalize(&fault);
        crate::observability::metrics::record_provider_fault(err.kind().as_str());
        tracing::debug!(
            code = ?fault.code,
            message = %fault.message,
            kind = err.kind().as_str(),
            "Provider fault normalized"
        );
        err
    }
}
