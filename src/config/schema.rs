//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet.
//! All types derive Serde traits for deserialization from config files.
//! Defaults describe the Sepolia test network and its public test tokens.

use serde::{Deserialize, Serialize};

use crate::blockchain::wallet::TREASURY_KEY_ENV_VAR;

/// Root configuration for the wallet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// The single supported network.
    pub network: NetworkConfig,

    /// Read-only fallback RPC settings.
    pub rpc: RpcConfig,

    /// Injected wallet (EIP-1193 endpoint) settings.
    pub wallet: WalletProviderConfig,

    /// Registered ERC-20 tokens.
    pub tokens: Vec<TokenConfig>,

    /// Transfer orchestration settings.
    pub transfer: TransferConfig,

    /// Treasury and third-party faucet settings.
    pub faucet: FaucetConfig,

    /// Periodic balance refresh.
    pub balances: BalancesConfig,

    /// Local transaction history.
    pub history: HistoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Native currency of the target chain.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Target chain descriptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain ID (11155111 for Sepolia).
    pub chain_id: u64,

    /// Human readable chain name, sent with add-chain requests.
    pub name: String,

    pub native_currency: NativeCurrency,

    /// RPC URLs advertised to the wallet when adding the chain.
    pub rpc_urls: Vec<String>,

    /// Block explorer base URL.
    pub explorer_url: String,
}

impl NetworkConfig {
    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111,
            name: "Sepolia Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![
                "https://rpc.sepolia.org".to_string(),
                "https://sepolia.gateway.tenderly.co".to_string(),
                "https://ethereum-sepolia.blockpi.network/v1/rpc/public".to_string(),
            ],
            explorer_url: "https://sepolia.etherscan.io".to_string(),
        }
    }
}

/// Fallback RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Public JSON-RPC endpoints, in preference order.
    pub fallback_urls: Vec<String>,

    /// Try every fallback endpoint in order instead of only the first.
    pub failover: bool,

    /// RPC request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            fallback_urls: vec![
                "https://ethereum-sepolia.blockpi.network/v1/rpc/public".to_string(),
                "https://sepolia.gateway.tenderly.co".to_string(),
                "https://rpc2.sepolia.org".to_string(),
            ],
            failover: false,
            timeout_secs: 10,
        }
    }
}

/// Wallet provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletProviderConfig {
    /// EIP-1193 JSON-RPC endpoint exposed by the user's wallet.
    /// `None` means no wallet is present.
    pub url: Option<String>,

    /// Interval for polling account/chain changes, in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound for the poll backoff after repeated failures.
    pub max_poll_backoff_ms: u64,
}

impl Default for WalletProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            poll_interval_ms: 2000,
            max_poll_backoff_ms: 30_000,
        }
    }
}

/// A registered ERC-20 token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub name: String,
    /// Contract address (hex).
    pub address: String,
    pub decimals: u8,
}

/// Transfer orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Safety buffer added to the estimated gas limit, in percent.
    pub gas_buffer_percent: u64,

    /// How long a terminal transfer state is shown before returning to idle.
    pub reset_after_secs: u64,

    /// Debounce delay for gas estimation on input change.
    pub debounce_ms: u64,

    /// Maximum time to wait for a transaction receipt.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            gas_buffer_percent: 20,
            reset_after_secs: 5,
            debounce_ms: 500,
            confirmation_timeout_secs: 180,
            receipt_poll_ms: 2000,
        }
    }
}

/// A third-party HTTP faucet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FaucetEndpointConfig {
    pub name: String,
    pub url: String,
}

/// Faucets that hand out a specific test token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenFaucetConfig {
    /// Token symbol the endpoints dispense.
    pub token: String,
    #[serde(default)]
    pub endpoints: Vec<FaucetEndpointConfig>,
    /// Faucet page handed to the user when no endpoint accepts;
    /// `{address}` is substituted.
    #[serde(default)]
    pub manual_url: Option<String>,
}

/// Treasury top-up and faucet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Native amount sent by the treasury, in ether units.
    pub amount: String,

    /// Cooldown between successful requests, in seconds.
    pub cooldown_secs: u64,

    /// Gas limit for the treasury's plain value transfer.
    pub gas_limit: u64,

    /// Environment variable holding the treasury private key.
    pub treasury_key_env: String,

    /// Native-currency HTTP faucets, tried in order.
    pub endpoints: Vec<FaucetEndpointConfig>,

    /// Per-token HTTP faucets.
    pub token_endpoints: Vec<TokenFaucetConfig>,

    /// Manual faucet page; `{address}` is substituted.
    pub manual_url: String,

    /// Network name sent to token faucets.
    pub network_label: String,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long a finished top-up is shown before returning to idle.
    pub reset_after_secs: u64,
}

impl FaucetConfig {
    /// Manual faucet page for an address.
    pub fn manual_url_for(&self, address: &str) -> String {
        self.manual_url.replace("{address}", address)
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            amount: "0.1".to_string(),
            cooldown_secs: 24 * 60 * 60,
            gas_limit: 21_000,
            treasury_key_env: TREASURY_KEY_ENV_VAR.to_string(),
            endpoints: vec![FaucetEndpointConfig {
                name: "Sepolia Faucet".to_string(),
                url: "https://sepoliafaucet.com/api/faucet".to_string(),
            }],
            token_endpoints: vec![
                TokenFaucetConfig {
                    token: "WETH".to_string(),
                    endpoints: vec![FaucetEndpointConfig {
                        name: "Paradigm".to_string(),
                        url: "https://faucet.paradigm.xyz/".to_string(),
                    }],
                    manual_url: None,
                },
                TokenFaucetConfig {
                    token: "LINK".to_string(),
                    endpoints: Vec::new(),
                    manual_url: Some(
                        "https://faucets.chain.link/sepolia?address={address}&token=link"
                            .to_string(),
                    ),
                },
                TokenFaucetConfig {
                    token: "USDC".to_string(),
                    endpoints: vec![
                        FaucetEndpointConfig {
                            name: "Circle".to_string(),
                            url: "https://faucet.circle.com/api/faucet".to_string(),
                        },
                        FaucetEndpointConfig {
                            name: "Sepolia".to_string(),
                            url: "https://sepoliafaucet.com/api/faucet".to_string(),
                        },
                        FaucetEndpointConfig {
                            name: "QuickNode".to_string(),
                            url: "https://faucet.quicknode.com/sepolia".to_string(),
                        },
                    ],
                    manual_url: None,
                },
            ],
            manual_url: "https://sepoliafaucet.com/?address={address}".to_string(),
            network_label: "sepolia".to_string(),
            request_timeout_secs: 15,
            reset_after_secs: 5,
        }
    }
}

/// Balance refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancesConfig {
    /// Refresh interval in seconds.
    pub refresh_interval_secs: u64,
}

impl Default for BalancesConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
        }
    }
}

/// Transaction history configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON file the history is persisted to. In-memory only when unset.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus scrape address for long-running commands, e.g.
    /// `127.0.0.1:9090`. No exporter when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

/// Sepolia test tokens.
pub fn default_tokens() -> Vec<TokenConfig> {
    vec![
        TokenConfig {
            symbol: "USDC".to_string(),
            name: "USD Coin (Test)".to_string(),
            address: "0x94a9D9AC8a22534E3FaCa9F4e7F2E2cf85d5E4C8".to_string(),
            decimals: 6,
        },
        TokenConfig {
            symbol: "LINK".to_string(),
            name: "Chainlink Token".to_string(),
            address: "0x779877A7B0D9E8603169DdbD7836e478b4624789".to_string(),
            decimals: 18,
        },
        TokenConfig {
            symbol: "WETH".to_string(),
            name: "Wrapped Ethereum".to_string(),
            address: "0x7b79995e5f793A07Bc00c21412e50Ecae098E7f9".to_string(),
            decimals: 18,
        },
    ]
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            rpc: RpcConfig::default(),
            wallet: WalletProviderConfig::default(),
            tokens: default_tokens(),
            transfer: TransferConfig::default(),
            faucet: FaucetConfig::default(),
            balances: BalancesConfig::default(),
            history: HistoryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
