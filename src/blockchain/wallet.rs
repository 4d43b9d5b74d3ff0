//! Treasury signing key.
//!
//! # Security
//! - The private key is loaded ONLY from an environment variable
//! - Keys are never logged or serialized
//! - Any holder of the key controls the treasury; this is a demo-grade
//!   custody model for test networks

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{ProviderFault, ProviderResult};

/// Default environment variable holding the treasury key.
pub const TREASURY_KEY_ENV_VAR: &str = "TESTNET_WALLET_TREASURY_KEY";

/// Privileged, pre-funded wallet used for gas top-ups.
#[derive(Clone)]
pub struct TreasuryWallet {
    signer: PrivateKeySigner,
}

impl TreasuryWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> ProviderResult<Self> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        let signer: PrivateKeySigner = key_hex.parse().map_err(|e| {
            ProviderFault::message(format!("Invalid treasury private key format: {}", e))
        })?;

        Ok(Self { signer })
    }

    /// Load the treasury key from the named environment variable.
    pub fn from_env(var: &str) -> ProviderResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            ProviderFault::message(format!("Environment variable {} not set", var))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Get the treasury's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Signer to bind to a connection.
    pub fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }
}

impl std::fmt::Debug for TreasuryWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreasuryWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = TreasuryWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = TreasuryWallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = TreasuryWallet::from_private_key("invalid_key");
        assert!(result.unwrap_err().message.contains("Invalid treasury private key"));
    }

    #[test]
    fn test_missing_env_var() {
        let err = TreasuryWallet::from_env("TESTNET_WALLET_TEST_UNSET_KEY").unwrap_err();
        assert!(err.message.contains("not set"));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = TreasuryWallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(!debug.contains(TEST_PRIVATE_KEY));
        assert!(debug.contains("TreasuryWallet"));
    }
}
