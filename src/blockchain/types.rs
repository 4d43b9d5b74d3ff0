//! Chain-specific types and the raw provider failure shape.

use alloy::primitives::{TxHash, U256};
use alloy::transports::TransportError;
use serde::{Deserialize, Serialize};

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Parse a chain id as reported by a wallet: `0x`-hex or decimal.
    pub fn parse(value: &str) -> Result<Self, ProviderFault> {
        let value = value.trim();
        let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => value.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|e| ProviderFault::message(format!("Invalid chain id '{}': {}", value, e)))
    }

    /// Hex form used in wallet requests, e.g. `0xaa36a7`.
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Untyped failure reported by a wallet or RPC node.
///
/// Mirrors the EIP-1193 `ProviderRpcError` shape. Only [`crate::error::normalize`]
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFault {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// A fault without a structured code.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// A request that exceeded its deadline.
    pub fn timeout(secs: u64) -> Self {
        Self::message(format!("network request timed out after {} seconds", secs))
    }
}

impl std::fmt::Display for ProviderFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderFault {}

impl From<TransportError> for ProviderFault {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::new(payload.code, payload.message.to_string()),
            None => Self::message(err.to_string()),
        }
    }
}

/// Result type for raw provider calls.
pub type ProviderResult<T> = Result<T, ProviderFault>;

/// Final state of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// Receipt status 1.
    Success { hash: TxHash, block_number: Option<u64> },
    /// Receipt status 0.
    Reverted { hash: TxHash },
}

impl ReceiptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReceiptOutcome::Success { .. })
    }
}

/// Gas estimate for a token transfer. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas_limit: u64,
    /// Legacy gas price in wei.
    pub gas_price: u128,
    /// `gas_limit * gas_price` in wei.
    pub total_cost: U256,
}

impl GasEstimate {
    pub fn new(gas_limit: u64, gas_price: u128) -> Self {
        Self {
            gas_limit,
            gas_price,
            total_cost: U256::from(gas_limit) * U256::from(gas_price),
        }
    }
}

/// Apply a percentage safety buffer to a gas limit, rounding up.
pub fn buffered_gas_limit(estimate: u64, buffer_percent: u64) -> u64 {
    let scaled = estimate as u128 * (100 + buffer_percent as u128);
    scaled.div_ceil(100).min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
    }

    #[test]
    fn test_chain_id_parse() {
        assert_eq!(ChainId::parse("0xaa36a7").unwrap(), ChainId(11_155_111));
        assert_eq!(ChainId::parse("11155111").unwrap(), ChainId(11_155_111));
        assert!(ChainId::parse("0xzz").is_err());
        assert_eq!(ChainId(11_155_111).to_hex(), "0xaa36a7");
    }

    #[test]
    fn test_buffered_gas_limit() {
        assert_eq!(buffered_gas_limit(100_000, 20), 120_000);
        assert_eq!(buffered_gas_limit(21_001, 20), 25_202);
        assert_eq!(buffered_gas_limit(1, 20), 2);
        assert_eq!(buffered_gas_limit(50_000, 0), 50_000);
    }

    #[test]
    fn test_gas_estimate_total() {
        let estimate = GasEstimate::new(21_000, 2_000_000_000);
        assert_eq!(estimate.total_cost, U256::from(42_000_000_000_000u128));
    }

    #[test]
    fn test_fault_display() {
        let fault = ProviderFault::new(4001, "User rejected the request.");
        assert_eq!(fault.to_string(), "User rejected the request. (code 4001)");
        assert!(ProviderFault::timeout(10).message.contains("network"));
    }
}
