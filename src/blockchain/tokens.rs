//! Static token reference data.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::blockchain::erc20::Erc20;
use crate::config::TokenConfig;

/// Immutable description of a registered ERC-20 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub name: String,
    pub contract_address: Address,
    /// Configured decimals; transfers re-read the on-chain value.
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn contract(&self) -> Erc20 {
        Erc20::new(self.contract_address)
    }
}

/// Lookup of tokens by symbol, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<TokenDescriptor>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<TokenDescriptor>) -> Self {
        Self { tokens }
    }

    /// Build from validated configuration; tokens with unparseable
    /// addresses are skipped with a warning.
    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let tokens = tokens
            .iter()
            .filter_map(|t| match t.address.parse::<Address>() {
                Ok(contract_address) => Some(TokenDescriptor {
                    symbol: t.symbol.clone(),
                    name: t.name.clone(),
                    contract_address,
                    decimals: t.decimals,
                }),
                Err(e) => {
                    tracing::warn!(symbol = %t.symbol, error = %e, "Skipping token with invalid address");
                    None
                }
            })
            .collect();
        Self { tokens }
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenDescriptor> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_tokens;

    #[test]
    fn test_registry_lookup() {
        let registry = TokenRegistry::from_config(&default_tokens());
        assert_eq!(registry.len(), 3);

        let usdc = registry.get("USDC").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert!(registry.get("DAI").is_none());
        assert!(registry.get("usdc").is_none());
    }

    #[test]
    fn test_invalid_address_skipped() {
        let mut tokens = default_tokens();
        tokens[1].address = "nope".to_string();
        let registry = TokenRegistry::from_config(&tokens);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("LINK").is_none());
    }
}
